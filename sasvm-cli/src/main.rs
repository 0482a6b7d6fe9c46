use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use sasvm_core::state;
use sasvm_core::{disassemble, Cell, Simulator, StepResult};

const DEFAULT_MEM_SIZE: usize = 256;
const DEFAULT_REG_COUNT: usize = 16;
const DEFAULT_TELETYPE_INDEX: usize = 15;
const DEFAULT_CYCLE_BUDGET: u32 = 10_000;

#[derive(Parser)]
#[command(name = "sasvm", about = "Assembler, simulator, and disassembler for the SASVM pedagogical virtual machine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Assemble a source file into a `.prg` or `.svm` image.
    Asm {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Assemble or load a program and run it to completion.
    Run {
        input: PathBuf,
        #[arg(long, default_value_t = DEFAULT_CYCLE_BUDGET)]
        cycle_budget: u32,
    },
    /// Disassemble a `.prg` or `.svm` image, one line per instruction.
    Disasm { input: PathBuf },
}

#[derive(Debug)]
enum Error {
    Io(std::io::Error, PathBuf),
    Assemble(sasvm_asm::Error),
    State(sasvm_core::StateError),
    UnrecognizedExtension(PathBuf),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err, path) => write!(f, "{}: {}", path.display(), err),
            Error::Assemble(err) => write!(f, "{}", err),
            Error::State(err) => write!(f, "{}", err),
            Error::UnrecognizedExtension(path) => {
                write!(f, "{}: expected a .asm, .prg, or .svm extension", path.display())
            }
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Asm { input, output } => run_asm(&input, output.as_deref()),
        Command::Run { input, cycle_budget } => run_run(&input, cycle_budget),
        Command::Disasm { input } => run_disasm(&input),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn extension_of(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

fn read_to_string(path: &Path) -> Result<String, Error> {
    fs::read_to_string(path).map_err(|err| Error::Io(err, path.to_path_buf()))
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, Error> {
    fs::read(path).map_err(|err| Error::Io(err, path.to_path_buf()))
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), Error> {
    fs::write(path, bytes).map_err(|err| Error::Io(err, path.to_path_buf()))
}

fn assemble_file(path: &Path) -> Result<Simulator, Error> {
    let source = read_to_string(path)?;
    let memory = sasvm_asm::assemble(&source, DEFAULT_MEM_SIZE).map_err(Error::Assemble)?;
    let mut simulator = Simulator::new(DEFAULT_MEM_SIZE, DEFAULT_REG_COUNT, vec![DEFAULT_TELETYPE_INDEX]);
    simulator.load_memory(memory);
    Ok(simulator)
}

/// Loads a program from any of the three source formats the CLI accepts,
/// dispatching on the input file's extension.
fn load_simulator(path: &Path) -> Result<Simulator, Error> {
    match extension_of(path) {
        Some("asm") => assemble_file(path),
        Some("prg") => {
            let bytes = read_bytes(path)?;
            let mut simulator = Simulator::new(DEFAULT_MEM_SIZE, DEFAULT_REG_COUNT, vec![DEFAULT_TELETYPE_INDEX]);
            simulator.parse_program_memory(&bytes).map_err(Error::State)?;
            Ok(simulator)
        }
        Some("svm") => {
            let bytes = read_bytes(path)?;
            let mut simulator = Simulator::new(DEFAULT_MEM_SIZE, DEFAULT_REG_COUNT, vec![DEFAULT_TELETYPE_INDEX]);
            simulator.parse_program_state(&bytes).map_err(Error::State)?;
            Ok(simulator)
        }
        _ => Err(Error::UnrecognizedExtension(path.to_path_buf())),
    }
}

fn run_asm(input: &Path, output: Option<&Path>) -> Result<(), Error> {
    let simulator = assemble_file(input)?;
    let output_path = output.map(Path::to_path_buf).unwrap_or_else(|| input.with_extension("prg"));

    let bytes = match extension_of(&output_path) {
        Some("svm") => simulator.dump_program_svm_state(),
        _ => simulator.dump_program_memory(),
    };
    write_bytes(&output_path, &bytes)
}

fn run_run(input: &Path, cycle_budget: u32) -> Result<(), Error> {
    let mut simulator = load_simulator(input)?;

    let mut cycles = 0;
    let reason = loop {
        if cycles >= cycle_budget {
            break "cycle budget exhausted";
        }
        match simulator.step() {
            StepResult::Continued => {
                print!("{}", simulator.return_stdout());
                cycles += 1;
            }
            StepResult::Halted => break "halted",
            StepResult::EndOfMemory => break "end of memory",
        }
    };

    eprintln!("{}", reason);
    Ok(())
}

fn run_disasm(input: &Path) -> Result<(), Error> {
    let bytes = read_bytes(input)?;
    let cells: Vec<Cell> = match extension_of(input) {
        Some("svm") => {
            state::decode_svm(&bytes, DEFAULT_MEM_SIZE, DEFAULT_REG_COUNT)
                .map_err(Error::State)?
                .memory
        }
        _ => state::decode_prg(&bytes),
    };

    let words: Vec<String> = cells.chunks(2).filter(|pair| pair.len() == 2).map(|pair| format!("{}{}", pair[0], pair[1])).collect();
    for line in disassemble(&words) {
        println!("{}", line);
    }
    Ok(())
}
