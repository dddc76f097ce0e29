use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use miette::{Diagnostic as _, Report};
use tracing_subscriber::EnvFilter;

use otto85::runtime::DEFAULT_ORIGIN;
use otto85::{assemble, disasm, Cpu, Image, RegValue};

/// otto85 is a complete assembler & emulator toolchain for the Intel 8085.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Assemble a `.asm` file into a raw 64 KiB image
    Assemble {
        /// `.asm` file to assemble
        input: PathBuf,
        /// Destination for the image (default: `<input>.bin`)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check a `.asm` file without writing an image
    Check {
        /// File to check
        input: PathBuf,
    },
    /// Assemble a `.asm` file and run it until HLT
    Run {
        /// `.asm` file to run
        input: PathBuf,
        /// Give up after this many executed instructions
        #[arg(long, default_value_t = 50_000_000)]
        step_limit: u64,
    },
    /// Print a listing of an assembled image
    Disasm {
        /// Raw image file
        input: PathBuf,
        /// Address the listing starts at
        #[arg(long, default_value_t = DEFAULT_ORIGIN)]
        origin: u16,
        /// Number of bytes to decode
        #[arg(long, default_value_t = 64)]
        count: usize,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match args.command {
        Command::Assemble { input, output } => cmd_assemble(input, output),
        Command::Check { input } => cmd_check(input),
        Command::Run { input, step_limit } => cmd_run(input, step_limit),
        Command::Disasm {
            input,
            origin,
            count,
        } => cmd_disasm(input, origin, count),
    }
}

fn read_source(path: &PathBuf) -> Result<String, ExitCode> {
    fs::read_to_string(path).map_err(|err| {
        eprintln!("{}: {err}", path.display());
        ExitCode::FAILURE
    })
}

/// `path:line:col: message` on stderr, then a failure code. The first
/// labelled span of the diagnostic locates the error.
fn report_failure(path: &PathBuf, src: &str, report: Report) -> ExitCode {
    let offs = report
        .labels()
        .and_then(|mut labels| labels.next())
        .map(|label| label.offset())
        .unwrap_or(0);
    let (line, col) = line_col(src, offs);
    eprintln!("{}:{line}:{col}: {report}", path.display());
    ExitCode::FAILURE
}

fn line_col(src: &str, offs: usize) -> (usize, usize) {
    let offs = offs.min(src.len());
    let upto = &src[..offs];
    let line = upto.matches('\n').count() + 1;
    let col = offs - upto.rfind('\n').map(|p| p + 1).unwrap_or(0) + 1;
    (line, col)
}

fn cmd_assemble(input: PathBuf, output: Option<PathBuf>) -> ExitCode {
    let src = match read_source(&input) {
        Ok(src) => src,
        Err(code) => return code,
    };
    println!(
        "{:>12} target {}",
        "Assembling".green().bold(),
        input.display()
    );
    let out = match assemble(src.clone(), &input.to_string_lossy()) {
        Ok(out) => out,
        Err(report) => return report_failure(&input, &src, report),
    };
    let out_path = output.unwrap_or_else(|| input.with_extension("bin"));
    if let Err(err) = out.image.save(&out_path) {
        eprintln!("{}: {err}", out_path.display());
        return ExitCode::FAILURE;
    }
    println!(
        "{:>12} {}",
        "Saved to".green().bold(),
        out_path.display()
    );
    ExitCode::SUCCESS
}

fn cmd_check(input: PathBuf) -> ExitCode {
    let src = match read_source(&input) {
        Ok(src) => src,
        Err(code) => return code,
    };
    println!(
        "{:>12} target {}",
        "Checking".green().bold(),
        input.display()
    );
    match assemble(src.clone(), &input.to_string_lossy()) {
        Ok(_) => {
            println!("{:>12} with 0 errors", "Finished".green().bold());
            ExitCode::SUCCESS
        }
        Err(report) => report_failure(&input, &src, report),
    }
}

fn cmd_run(input: PathBuf, step_limit: u64) -> ExitCode {
    let src = match read_source(&input) {
        Ok(src) => src,
        Err(code) => return code,
    };
    println!(
        "{:>12} target {}",
        "Assembling".green().bold(),
        input.display()
    );
    let out = match assemble(src.clone(), &input.to_string_lossy()) {
        Ok(out) => out,
        Err(report) => return report_failure(&input, &src, report),
    };

    println!("{:>12} binary", "Running".green().bold());
    let mut cpu = Cpu::default();
    cpu.load(out.image.as_bytes(), DEFAULT_ORIGIN);
    match cpu.run_to_halt(step_limit) {
        Ok(steps) => {
            if !cpu.halted() {
                eprintln!("gave up after {steps} instructions without reaching HLT");
                return ExitCode::FAILURE;
            }
        }
        Err(fault) => {
            eprintln!("runtime error: {fault}");
            return ExitCode::FAILURE;
        }
    }
    print_state(&cpu);
    println!(
        "{:>12} target {}",
        "Completed".green().bold(),
        input.display()
    );
    ExitCode::SUCCESS
}

fn print_state(cpu: &Cpu) {
    let byte = |name: &str| match cpu.register(name) {
        Some(RegValue::Byte(value)) => value,
        _ => 0,
    };
    println!(
        "A={:02X} B={:02X} C={:02X} D={:02X} E={:02X} H={:02X} L={:02X} \
         SP={:04X} PC={:04X} FLAGS={:02X}",
        byte("A"),
        byte("B"),
        byte("C"),
        byte("D"),
        byte("E"),
        byte("H"),
        byte("L"),
        cpu.sp(),
        cpu.pc(),
        u8::from(cpu.flags()),
    );
}

fn cmd_disasm(input: PathBuf, origin: u16, count: usize) -> ExitCode {
    let image = match Image::from_file(&input) {
        Ok(image) => image,
        Err(err) => {
            eprintln!("{}: {err}", input.display());
            return ExitCode::FAILURE;
        }
    };
    let count = count.min(0x10000 - origin as usize);
    for line in disasm::disassemble(image.as_bytes(), origin, count) {
        let bytes: Vec<String> = line.bytes.iter().map(|b| format!("{b:02X}")).collect();
        println!("{:04X}  {:<8}  {}", line.addr, bytes.join(" "), line.text);
    }
    ExitCode::SUCCESS
}
