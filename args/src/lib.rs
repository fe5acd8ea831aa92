// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! Command-line surface of the switch binary.

pub use clap::Parser;
use clap::ValueEnum;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// One `-e` entry: a device name with an optional logical port number,
/// `DEV[:PORT_NO]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchPortArg {
    pub device: String,
    pub port_no: Option<u32>,
}

impl FromStr for SwitchPortArg {
    type Err = String;

    fn from_str(input: &str) -> Result<SwitchPortArg, String> {
        let (device, port) = match input.split_once(':') {
            None => (input, None),
            Some((device, port)) => {
                let port_no = parse_number(port)
                    .ok()
                    .and_then(|n| u32::try_from(n).ok())
                    .ok_or_else(|| format!("invalid port number '{port}'"))?;
                (device, Some(port_no))
            }
        };
        if device.is_empty() {
            return Err("empty device name".to_owned());
        }
        if device.len() >= 16 {
            return Err(format!("device name '{device}' too long"));
        }
        Ok(SwitchPortArg { device: device.to_owned(), port_no: port })
    }
}

/// Where log lines go; `-t` accepts a comma-separated set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogSink {
    File,
    Syslog,
    Stdout,
}

fn parse_number(input: &str) -> Result<u64, ()> {
    let input = input.trim();
    if let Some(hex) = input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).map_err(|_| ())
    } else {
        input.parse().map_err(|_| ())
    }
}

fn parse_datapath_id(input: &str) -> Result<u64, String> {
    parse_number(input).map_err(|()| format!("invalid datapath id '{input}'"))
}

#[derive(Debug, Parser)]
#[command(name = "softflow-switch")]
#[command(version)]
#[command(about = "An OpenFlow 1.3 soft switch", long_about = None)]
pub struct CmdArgs {
    /// Set the logging level.
    #[arg(
        short = 'l',
        long = "logging_level",
        value_name = "LEVEL",
        default_value = "info",
        value_parser = ["debug", "info", "warn", "error", "critical"]
    )]
    pub logging_level: String,

    /// Run as a daemon.
    #[arg(short = 'd', long)]
    pub daemonize: bool,

    /// Set the datapath id; hexadecimal with an 0x prefix is accepted.
    #[arg(
        short = 'i',
        long = "datapath_id",
        value_name = "DATAPATH_ID",
        default_value = "1",
        value_parser = parse_datapath_id
    )]
    pub datapath_id: u64,

    /// Maximum number of flow entries per table.
    #[arg(short = 'm', long = "max_flow_entries", value_name = "N", default_value_t = 255)]
    pub max_flow_entries: u16,

    /// Controller address to connect to.
    #[arg(short = 'c', long = "server_ip", value_name = "A.B.C.D", default_value = "127.0.0.1")]
    pub server_ip: Ipv4Addr,

    /// Controller port to connect to.
    #[arg(short = 'p', long = "server_port", value_name = "PORT", default_value_t = 6653)]
    pub server_port: u16,

    /// Comma-separated switch ports, each DEV[:PORT_NO].
    #[arg(
        short = 'e',
        long = "switch_ports",
        value_name = "DEV[:PORT_NO][,...]",
        value_parser = SwitchPortArg::from_str,
        value_delimiter = ','
    )]
    pub switch_ports: Vec<SwitchPortArg>,

    /// Comma-separated log sinks.
    #[arg(
        short = 't',
        long = "logging_type",
        value_name = "file,syslog,stdout",
        value_delimiter = ',',
        value_enum
    )]
    pub logging_type: Vec<LogSink>,
}

impl CmdArgs {
    /// Effective sinks: the `-t` set when given; otherwise file, plus
    /// stdout when not daemonised. `-d` always strips stdout.
    #[must_use]
    pub fn log_sinks(&self) -> Vec<LogSink> {
        let mut sinks = if self.logging_type.is_empty() {
            if self.daemonize {
                vec![LogSink::File]
            } else {
                vec![LogSink::File, LogSink::Stdout]
            }
        } else {
            self.logging_type.clone()
        };
        if self.daemonize {
            sinks.retain(|sink| *sink != LogSink::Stdout);
        }
        sinks
    }

    /// `<progname>.<datapath_id>`, the stem of the pid and log files.
    #[must_use]
    pub fn instance_name(&self) -> String {
        format!("switch.{:#x}", self.datapath_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_full_flag_set() {
        let args = CmdArgs::parse_from([
            "softflow-switch",
            "-l",
            "debug",
            "-i",
            "0xabc",
            "-m",
            "512",
            "-c",
            "10.0.0.9",
            "-p",
            "6634",
            "-e",
            "veth0:1,veth1:2",
            "-t",
            "file,stdout",
        ]);
        assert_eq!(args.logging_level, "debug");
        assert_eq!(args.datapath_id, 0xabc);
        assert_eq!(args.max_flow_entries, 512);
        assert_eq!(args.server_ip, Ipv4Addr::new(10, 0, 0, 9));
        assert_eq!(args.server_port, 6634);
        assert_eq!(
            args.switch_ports,
            vec![
                SwitchPortArg { device: "veth0".to_owned(), port_no: Some(1) },
                SwitchPortArg { device: "veth1".to_owned(), port_no: Some(2) },
            ]
        );
        assert_eq!(args.log_sinks(), vec![LogSink::File, LogSink::Stdout]);
    }

    #[test]
    fn defaults_match_the_original() {
        let args = CmdArgs::parse_from(["softflow-switch"]);
        assert_eq!(args.logging_level, "info");
        assert_eq!(args.datapath_id, 1);
        assert_eq!(args.max_flow_entries, 255);
        assert_eq!(args.server_ip, Ipv4Addr::LOCALHOST);
        assert_eq!(args.server_port, 6653);
        assert!(args.switch_ports.is_empty());
        assert_eq!(args.log_sinks(), vec![LogSink::File, LogSink::Stdout]);
    }

    #[test]
    fn daemonize_strips_stdout() {
        let args = CmdArgs::parse_from(["softflow-switch", "-d", "-t", "file,stdout"]);
        assert_eq!(args.log_sinks(), vec![LogSink::File]);
    }

    #[test]
    fn port_specs_without_numbers_are_auto_assigned() {
        let spec: SwitchPortArg = "veth9".parse().unwrap();
        assert_eq!(spec.device, "veth9");
        assert_eq!(spec.port_no, None);

        assert!("".parse::<SwitchPortArg>().is_err());
        assert!("veth0:x".parse::<SwitchPortArg>().is_err());
        assert!("a-name-that-is-too-long:1".parse::<SwitchPortArg>().is_err());
    }

    #[test]
    fn bad_arguments_are_rejected() {
        assert!(CmdArgs::try_parse_from(["softflow-switch", "-l", "chatty"]).is_err());
        assert!(CmdArgs::try_parse_from(["softflow-switch", "-i", "zz"]).is_err());
        assert!(CmdArgs::try_parse_from(["softflow-switch", "-t", "journal"]).is_err());
    }

    #[test]
    fn instance_name_embeds_the_datapath_id() {
        let args = CmdArgs::parse_from(["softflow-switch", "-i", "0xab"]);
        assert_eq!(args.instance_name(), "switch.0xab");
    }
}
