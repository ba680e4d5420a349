//! Line-oriented command parsing for the `pifire-bridge` binary.
//!
//! One command per line, words separated by whitespace:
//!
//! ```text
//! startup | shutdown | smoke | hold | stop | monitor
//! prime <amount> <next-mode>
//! splus
//! target <temp>
//! pmode <n>
//! history [minutes]
//! stream on|off
//! server pifire|localhost|custom [address]
//! show
//! ```

use pifire_common::{PowerCommand, ServerConfig, ServerSelection};

pub const DEFAULT_HISTORY_MINUTES: u32 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Power(PowerCommand),
    Prime { amount: i64, next_mode: String },
    /// Resolved against the current snapshot before it is sent.
    ToggleSmokePlus,
    SetTargetTemp(i64),
    SetPMode(i64),
    FetchHistory { minutes: u32 },
    Stream(bool),
    SetServer(ServerConfig),
    Show,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsoleError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error("'{command}' expects {expected}")]
    Usage {
        command: &'static str,
        expected: &'static str,
    },
    #[error("'{0}' is not a whole number")]
    NotANumber(String),
}

pub fn parse_line(line: &str) -> Result<ConsoleCommand, ConsoleError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err(ConsoleError::Empty);
    };
    let args: Vec<&str> = words.collect();

    if let Ok(power) = head.parse::<PowerCommand>() {
        return if args.is_empty() {
            Ok(ConsoleCommand::Power(power))
        } else {
            Err(ConsoleError::Usage {
                command: power.as_mode(),
                expected: "no arguments",
            })
        };
    }

    match head.to_ascii_lowercase().as_str() {
        "prime" => match args.as_slice() {
            [amount, next_mode] => Ok(ConsoleCommand::Prime {
                amount: number(amount)?,
                next_mode: (*next_mode).to_string(),
            }),
            _ => Err(ConsoleError::Usage {
                command: "prime",
                expected: "<amount> <next-mode>",
            }),
        },
        "splus" => Ok(ConsoleCommand::ToggleSmokePlus),
        "target" => match args.as_slice() {
            [temp] => Ok(ConsoleCommand::SetTargetTemp(number(temp)?)),
            _ => Err(ConsoleError::Usage {
                command: "target",
                expected: "<temp>",
            }),
        },
        "pmode" => match args.as_slice() {
            [mode] => Ok(ConsoleCommand::SetPMode(number(mode)?)),
            _ => Err(ConsoleError::Usage {
                command: "pmode",
                expected: "<n>",
            }),
        },
        "history" => match args.as_slice() {
            [] => Ok(ConsoleCommand::FetchHistory {
                minutes: DEFAULT_HISTORY_MINUTES,
            }),
            [minutes] => minutes
                .parse::<u32>()
                .map(|minutes| ConsoleCommand::FetchHistory { minutes })
                .map_err(|_| ConsoleError::NotANumber((*minutes).to_string())),
            _ => Err(ConsoleError::Usage {
                command: "history",
                expected: "[minutes]",
            }),
        },
        "stream" => match args.as_slice() {
            ["on"] => Ok(ConsoleCommand::Stream(true)),
            ["off"] => Ok(ConsoleCommand::Stream(false)),
            _ => Err(ConsoleError::Usage {
                command: "stream",
                expected: "on|off",
            }),
        },
        "server" => match args.as_slice() {
            [selection] => Ok(ConsoleCommand::SetServer(ServerConfig {
                server_selection: ServerSelection::parse(selection),
                custom_ip: custom_ip_for(selection),
            })),
            [selection, address] => Ok(ConsoleCommand::SetServer(ServerConfig {
                server_selection: ServerSelection::parse(selection),
                custom_ip: (*address).to_string(),
            })),
            _ => Err(ConsoleError::Usage {
                command: "server",
                expected: "pifire|localhost|custom [address]",
            }),
        },
        "show" => Ok(ConsoleCommand::Show),
        _ => Err(ConsoleError::Unknown(head.to_string())),
    }
}

fn number(raw: &str) -> Result<i64, ConsoleError> {
    raw.parse::<i64>()
        .map_err(|_| ConsoleError::NotANumber(raw.to_string()))
}

// `server 10.0.0.7` is shorthand for a custom address.
fn custom_ip_for(selection: &str) -> String {
    match ServerSelection::parse(selection) {
        ServerSelection::Custom if !selection.eq_ignore_ascii_case("custom") => {
            selection.to_string()
        }
        _ => String::new(),
    }
}
