//! Running the external programs configured in [`Config`](crate::Config).

use std::process::{Command, ExitStatus};

use tracing::debug;

use crate::errors::FogToolsErr;

/// Build a command from a configured argument vector, program first.
pub(crate) fn command(argv: &[String]) -> Result<Command, FogToolsErr> {
    let (program, args) = argv
        .split_first()
        .ok_or(FogToolsErr::LogicError("empty command line configured"))?;

    let mut cmd = Command::new(program);
    cmd.args(args);
    Ok(cmd)
}

/// Run `cmd` to completion and return its exit status.
pub(crate) fn status(mut cmd: Command) -> Result<ExitStatus, FogToolsErr> {
    debug!("Running {:?}", cmd);
    Ok(cmd.status()?)
}

/// Run `cmd` to completion, failing unless it exits successfully.
pub(crate) fn run_checked(cmd: Command) -> Result<(), FogToolsErr> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    let status = status(cmd)?;

    if status.success() {
        Ok(())
    } else {
        Err(FogToolsErr::Command {
            program,
            code: status.code(),
        })
    }
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_command() {
        assert!(command(&[]).is_err());
    }

    #[test]
    fn test_run_checked() {
        assert!(run_checked(command(&argv(&["true"])).unwrap()).is_ok());

        match run_checked(command(&argv(&["sh", "-c", "exit 3"])).unwrap()) {
            Err(FogToolsErr::Command { program, code }) => {
                assert_eq!(program, "sh");
                assert_eq!(code, Some(3));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
