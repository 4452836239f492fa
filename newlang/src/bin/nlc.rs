//! NewLang command-line driver.
//!
//! Usage:
//!   nlc run FILE [--exec] [-I DIR]...   # execute a source file
//!   nlc eval "EXPR"                     # evaluate a snippet
//!   nlc repl                            # interactive loop
//!
//! Exit codes: 0 on success, 1 on evaluation error, 2 on parse error.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};

use newlang::error::{NlError, SpannedNlError};
use newlang::interp::InterpreterConfig;
use newlang::repl::{ReplOutcome, ReplSession};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        print_usage();
        return ExitCode::from(2);
    };

    match command.as_str() {
        "run" => command_run(&args[1..]),
        "eval" => command_eval(&args[1..]),
        "repl" => command_repl(),
        "--version" | "-V" => {
            println!("nlc {VERSION}");
            ExitCode::SUCCESS
        }
        _ => {
            print_usage();
            ExitCode::from(2)
        }
    }
}

fn print_usage() {
    eprintln!("usage: nlc run FILE [--exec] [-I DIR]... | nlc eval \"EXPR\" | nlc repl");
}

fn command_run(args: &[String]) -> ExitCode {
    let mut file = None;
    let mut include_dirs: Vec<PathBuf> = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--exec" => {}
            "-I" => match iter.next() {
                Some(dir) => include_dirs.push(PathBuf::from(dir)),
                None => {
                    eprintln!("-I needs a directory");
                    return ExitCode::from(2);
                }
            },
            other => file = Some(PathBuf::from(other)),
        }
    }
    let Some(file) = file else {
        print_usage();
        return ExitCode::from(2);
    };

    let path = include_dirs
        .iter()
        .map(|dir| dir.join(&file))
        .find(|candidate| candidate.exists())
        .unwrap_or(file);

    let source = match std::fs::read_to_string(&path) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("cannot read {}: {error}", path.display());
            return ExitCode::from(1);
        }
    };
    eval_once(&source)
}

fn command_eval(args: &[String]) -> ExitCode {
    let Some(source) = args.first() else {
        print_usage();
        return ExitCode::from(2);
    };
    eval_once(source)
}

/// Batch evaluation with the interrupt handler wired in.
fn eval_once(source: &str) -> ExitCode {
    let mut session = match ReplSession::with_config(InterpreterConfig::default()) {
        Ok(session) => session,
        Err(error) => return report(error),
    };
    install_interrupt_handler();
    attach_interrupt(&mut session);

    match session.eval(source) {
        ReplOutcome::Value(value) => {
            println!("{value}");
            ExitCode::SUCCESS
        }
        ReplOutcome::Error(error) => report(error),
    }
}

fn report(error: SpannedNlError) -> ExitCode {
    eprintln!("{error}");
    match error.error {
        NlError::Parse(_) => ExitCode::from(2),
        _ => ExitCode::from(1),
    }
}

// The handler flips interpreter flags; evaluation raises SignalError
// at the next statement boundary.
static INTERRUPT_SLOT: AtomicUsize = AtomicUsize::new(0);

extern "C" fn on_signal(_: libc::c_int) {
    let slot = INTERRUPT_SLOT.load(Ordering::Relaxed);
    if slot != 0 {
        // SAFETY: the slot holds a leaked AtomicBool installed below.
        let flag = unsafe { &*(slot as *const std::sync::atomic::AtomicBool) };
        flag.store(true, Ordering::Relaxed);
    }
}

fn install_interrupt_handler() {
    // SAFETY: standard sigaction-free handler installation; the
    // handler only touches atomics.
    unsafe {
        libc::signal(libc::SIGINT, on_signal as libc::sighandler_t);
        libc::signal(libc::SIGABRT, on_signal as libc::sighandler_t);
    }
}

fn attach_interrupt(session: &mut ReplSession) {
    // Leak one strong reference so the handler's pointer stays valid
    // for the life of the process.
    let flag = session.interpreter().interrupt_flag();
    let raw = std::sync::Arc::into_raw(flag);
    INTERRUPT_SLOT.store(raw as usize, Ordering::Relaxed);
}

fn command_repl() -> ExitCode {
    let mut session = match ReplSession::with_config(InterpreterConfig::default()) {
        Ok(session) => session,
        Err(error) => {
            eprintln!("{error}");
            return ExitCode::from(1);
        }
    };
    install_interrupt_handler();
    attach_interrupt(&mut session);

    println!("NewLang {VERSION} — ';;' or Ctrl-D exits");
    run_repl_loop(&mut session)
}

#[cfg(feature = "repl")]
fn run_repl_loop(session: &mut ReplSession) -> ExitCode {
    use rustyline::error::ReadlineError;

    let mut editor = match rustyline::DefaultEditor::new() {
        Ok(editor) => editor,
        Err(error) => {
            eprintln!("cannot start line editor: {error}");
            return ExitCode::from(1);
        }
    };

    loop {
        match editor.readline("nl> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if trimmed == ";;" {
                    return ExitCode::SUCCESS;
                }
                let _ = editor.add_history_entry(trimmed);
                match session.eval(trimmed) {
                    ReplOutcome::Value(value) => println!("{value}"),
                    ReplOutcome::Error(error) => eprintln!("{error}"),
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => return ExitCode::SUCCESS,
            Err(error) => {
                eprintln!("{error}");
                return ExitCode::from(1);
            }
        }
    }
}

#[cfg(not(feature = "repl"))]
fn run_repl_loop(session: &mut ReplSession) -> ExitCode {
    use std::io::{BufRead, Write};

    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        print!("nl> ");
        let _ = std::io::stdout().flush();
        line.clear();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => return ExitCode::SUCCESS,
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if trimmed == ";;" {
                    return ExitCode::SUCCESS;
                }
                match session.eval(trimmed) {
                    ReplOutcome::Value(value) => println!("{value}"),
                    ReplOutcome::Error(error) => eprintln!("{error}"),
                }
            }
            Err(error) => {
                eprintln!("{error}");
                return ExitCode::from(1);
            }
        }
    }
}
