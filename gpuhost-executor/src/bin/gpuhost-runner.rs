//! Callable runner: `gpuhost-runner <input> <output>`.
//!
//! Decodes the remote call in `<input>`, invokes it, and writes the encoded
//! return value to `<output>`. Any failure goes to stderr with exit code 1 and
//! leaves `<output>` unwritten.

use std::path::PathBuf;
use std::process::ExitCode;

use gpuhost_executor::{encode_result, ExecutorError, RemoteCall};

fn main() -> ExitCode {
    let mut args = std::env::args_os().skip(1);
    let (Some(input), Some(output)) = (args.next(), args.next()) else {
        eprintln!("usage: gpuhost-runner <input> <output>");
        return ExitCode::from(2);
    };

    match run(&PathBuf::from(input), &PathBuf::from(output)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(input: &std::path::Path, output: &std::path::Path) -> Result<(), ExecutorError> {
    let call = RemoteCall::from_bytes(&std::fs::read(input)?)?;
    let value = call.invoke()?;
    std::fs::write(output, encode_result(&value)?)?;
    Ok(())
}
