//! AT command catalog for modem bring-up.
//!
//! Commands other than the `+++` escape are written as
//! `AT<command><parameter>\r`; the modem answers each with one or more
//! carriage-return terminated lines.

/// One concrete AT exchange.
pub struct AtCommand<'a> {
    pub command: &'a str,
    pub parameter: Option<&'a [u8]>,
    /// Carriage returns terminating the full response.
    pub response_lines: usize,
}

#[derive(Debug)]
pub enum AtCommands<'a> {
    /// Enter (`+++` with guard times) or leave (`CN`) command mode.
    CmdMode(bool),
    /// Network discovery (`ND`).
    Discover(Option<&'a [u8]>),
    /// Any other command by name.
    Raw(&'a str, Option<&'a [u8]>),
}

impl AtCommands<'_> {
    pub fn create(&self) -> AtCommand {
        match *self {
            AtCommands::CmdMode(enter) => match enter {
                true => AtCommand {
                    command: "+++",
                    parameter: None,
                    response_lines: 1,
                },
                false => AtCommand {
                    command: "CN",
                    parameter: None,
                    response_lines: 1,
                },
            },
            AtCommands::Discover(param) => AtCommand {
                command: "ND",
                parameter: param,
                response_lines: 10 + 1,
            },
            AtCommands::Raw(command, param) => AtCommand {
                command,
                parameter: param,
                response_lines: 1,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_mode_escape_is_bare() {
        let enter = AtCommands::CmdMode(true).create();
        assert_eq!(enter.command, "+++");
        assert!(enter.parameter.is_none());

        let leave = AtCommands::CmdMode(false).create();
        assert_eq!(leave.command, "CN");
    }

    #[test]
    fn raw_commands_pass_through() {
        let api = AtCommands::Raw("AP", Some(b"1")).create();
        assert_eq!(api.command, "AP");
        assert_eq!(api.parameter, Some(&b"1"[..]));
        assert_eq!(api.response_lines, 1);
    }
}
