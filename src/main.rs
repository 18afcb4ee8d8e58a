use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use midly::Smf;
use tracing_subscriber::EnvFilter;

use pianola::{describe_tracks, output_path, prepare_file, OutOfRangePolicy, PrepError, RawSettings};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to input MIDI file
    input: PathBuf,

    /// Path to output MIDI file [default: <input>_modified.mid]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Index of the track to prepare
    #[arg(short, long, default_value_t = 0)]
    track: usize,

    /// YAML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Minimum time a key stays up between a release and the next press (ms)
    #[arg(long, allow_negative_numbers = true)]
    min_delay: Option<f64>,

    /// Minimum note length (ms)
    #[arg(long, allow_negative_numbers = true)]
    min_note_length: Option<f64>,

    /// How far sustain pedal presses move later (ms)
    #[arg(long, allow_negative_numbers = true)]
    pedal_offset: Option<f64>,

    /// Minimum time the pedal stays down after a shifted press (ms)
    #[arg(long, allow_negative_numbers = true)]
    min_pedal_length: Option<f64>,

    /// MIDI key of the instrument's lowest key
    #[arg(long)]
    lowest_key: Option<u8>,

    /// Number of keys on the instrument
    #[arg(long)]
    key_count: Option<u8>,

    /// Leave notes outside the instrument's range untouched instead of failing
    #[arg(long)]
    pass_through_out_of_range: bool,

    /// List the tracks of the input and exit
    #[arg(long)]
    list_tracks: bool,

    /// Print a YAML summary of the run
    #[arg(long)]
    summary: bool,

    /// Log every change
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Settings given on the command line, to be laid over the settings file.
    fn overrides(&self) -> RawSettings {
        RawSettings {
            min_delay: self.min_delay,
            min_note_length: self.min_note_length,
            pedal_offset: self.pedal_offset,
            min_pedal_length: self.min_pedal_length,
            lowest_key: self.lowest_key,
            key_count: self.key_count,
            sustain_controller: None,
            out_of_range: self.pass_through_out_of_range.then_some(OutOfRangePolicy::PassThrough),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), PrepError> {
    if cli.list_tracks {
        return list_tracks(cli);
    }

    let file_settings = match &cli.config {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(|source| PrepError::Io {
                path: path.clone(),
                source,
            })?;
            RawSettings::from_yaml(&content)?
        }
        None => RawSettings::default(),
    };
    let settings = file_settings.overlay(cli.overrides()).resolve()?;

    let output = cli.output.clone().unwrap_or_else(|| output_path(&cli.input));
    let summary = prepare_file(&cli.input, &output, cli.track, &settings)?;

    println!("{} events changed", summary.modifications);
    println!("Saved to {}", output.display());
    if cli.summary {
        match serde_yaml::to_string(&summary) {
            Ok(yaml) => print!("{}", yaml),
            Err(e) => eprintln!("Cannot print summary: {}", e),
        }
    }
    Ok(())
}

fn list_tracks(cli: &Cli) -> Result<(), PrepError> {
    let bytes = fs::read(&cli.input).map_err(|source| PrepError::Io {
        path: cli.input.clone(),
        source,
    })?;
    let smf = Smf::parse(&bytes).map_err(|e| PrepError::InputUnreadable(e.to_string()))?;
    let tracks = describe_tracks(&smf);

    println!("{} track(s) found", tracks.len());
    for track in tracks {
        println!(
            "{:>3}  {:<24}  {:>6} events  {:>5} notes  {:>3} tempo changes",
            track.index,
            track.name.as_deref().unwrap_or("-"),
            track.events,
            track.notes,
            track.tempo_changes
        );
    }
    Ok(())
}
