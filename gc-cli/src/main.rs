use std::fs;
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gc::circuit::{Circuit, parse_input_bits};
use gc::session::{GcSession, SessionState};
use gc::stream::BufferedLineStream;
use rand::rngs::OsRng;

/// Peer process for the two-party garbled-circuit protocol.
#[derive(Parser, Debug)]
#[command(name = "gc-cli")]
#[command(about = "Garbler/evaluator peers for the gc two-party protocol")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Print one line per session state transition.
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Act as the Garbler: connects out to the Evaluator.
    Garbler {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long)]
        port: u16,
        #[arg(long)]
        circuit: PathBuf,
        #[arg(long)]
        input: PathBuf,
    },
    /// Act as the Evaluator: listens for the Garbler to connect.
    Evaluator {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        #[arg(long)]
        port: u16,
        #[arg(long)]
        circuit: PathBuf,
        #[arg(long)]
        input: PathBuf,
    },
}

fn load_circuit(path: &PathBuf) -> Result<Circuit> {
    let file = fs::File::open(path).with_context(|| format!("opening circuit file {path:?}"))?;
    let mut stream = BufferedLineStream::new(file);
    Circuit::parse(&mut stream).with_context(|| format!("parsing circuit file {path:?}"))
}

fn load_input(path: &PathBuf, expected_len: usize) -> Result<Vec<bool>> {
    let contents = fs::read_to_string(path).with_context(|| format!("reading input file {path:?}"))?;
    let bits = parse_input_bits(&contents);
    if bits.len() < expected_len {
        anyhow::bail!(
            "input file {path:?} has {} bits, expected at least {}",
            bits.len(),
            expected_len
        );
    }
    Ok(bits[..expected_len].to_vec())
}

fn trace(verbose: bool) -> impl FnMut(SessionState) {
    move |state: SessionState| {
        if verbose {
            eprintln!("[gc-cli] -> {state:?}");
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Commands::Garbler {
            host,
            port,
            circuit,
            input,
        } => {
            let circuit = load_circuit(&circuit)?;
            let bits = load_input(&input, circuit.garbler_input_length)?;
            let stream = TcpStream::connect((host.as_str(), port))
                .with_context(|| format!("connecting to evaluator at {host}:{port}"))?;
            let mut rng = OsRng;
            let session = GcSession::new(stream).on_transition(trace(args.verbose));
            let output = session
                .run_garbler(&circuit, &bits, &mut rng)
                .map_err(|e| anyhow::anyhow!("session aborted: {e}"))?;
            println!("{output}");
        }
        Commands::Evaluator {
            host,
            port,
            circuit,
            input,
        } => {
            let circuit = load_circuit(&circuit)?;
            let bits = load_input(&input, circuit.evaluator_input_length)?;
            let listener = TcpListener::bind((host.as_str(), port))
                .with_context(|| format!("binding evaluator socket on {host}:{port}"))?;
            let (stream, peer) = listener.accept().context("accepting garbler connection")?;
            if args.verbose {
                eprintln!("[gc-cli] garbler connected from {peer}");
            }
            let mut rng = OsRng;
            let session = GcSession::new(stream).on_transition(trace(args.verbose));
            let output = session
                .run_evaluator(&circuit, &bits, &mut rng)
                .map_err(|e| anyhow::anyhow!("session aborted: {e}"))?;
            println!("{output}");
        }
    }

    Ok(())
}
