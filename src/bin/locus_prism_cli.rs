use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use locus_prism::error::{PrismError, Result};
use locus_prism::mapping_stats::{collate_mapping_stats, get_mapping_table};
use locus_prism::samplesheet::{compare_with_folder, parse_lane_list, predict_fastq_names, FastqNameOptions, SequencingType};
use locus_prism::tags::{tags_to_fasta, tags_to_tags, FastaOptions, SampleRate};
use locus_prism::types::{ColumnSelection, Measure, WeightingMethod};
use locus_prism::{build_sample_distribution, build_summary_table, BuildParams, TableParams};

const LONG_ABOUT: &str = "\
Summarise tabular BLAST reports (-outfmt 7) as (locus, genome) distributions.

example:

  for file in genome_alignment_blast/*.gz; do
    locus-prism build --weighting-method tag_count $file >> annotation/otsh_align.summary.txt
  done
  locus-prism table --measure frequency --rownames genome_alignment_blast/*.prism
  locus-prism table --measure information --rownames genome_alignment_blast/*.prism

With tag_count weighting the query line carries the weight, e.g.
  # Query: seq_26674 count=16";

#[derive(Parser)]
#[command(version, about, long_about = LONG_ABOUT)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and save the top-hit distribution of one sample
    Build(BuildCmd),
    /// Tabulate saved distributions across samples
    Table(TableCmd),
    /// Collate samtools flagstat reports into mapping rates
    MappingStats(MappingStatsCmd),
    /// List the FASTQ file names an Illumina sample sheet should produce
    FastqNames(FastqNamesCmd),
    /// Write a tag count stream (stdin) as FASTA
    TagsToFasta(TagsToFastaCmd),
    /// Copy a tag count stream (stdin), optionally sampled
    TagsToTags(TagsToTagsCmd),
}

#[derive(Args)]
struct BuildCmd {
    /// BLAST reports for one sample (optionally gzip compressed)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    #[arg(long, value_enum, default_value_t = WeightingMethod::Unweighted)]
    weighting_method: WeightingMethod,

    /// Column holding the subject (locus) accession
    #[arg(long, default_value_t = 1)]
    locus_column: usize,

    /// Column holding the query, used when the report has no "# Query:" lines
    #[arg(long, default_value_t = 0)]
    query_column: usize,

    /// Fewer fields than this and a line is not a hit
    #[arg(long, default_value_t = 5)]
    min_fields: usize,

    /// Fail if the hits of a query are not contiguous
    #[arg(long)]
    strict_grouping: bool,

    /// Save one distribution per input instead of one for all inputs
    #[arg(long)]
    separate: bool,

    /// Artifact path (default: common prefix of the inputs + .prism)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct TableCmd {
    /// Saved distributions (.prism)
    #[arg(required = true)]
    artifacts: Vec<PathBuf>,

    #[arg(long, value_enum, default_value_t = Measure::Frequency)]
    measure: Measure,

    /// Combine genome and locus fields to make a rowname
    #[arg(long)]
    rownames: bool,
}

#[derive(Args)]
struct MappingStatsCmd {
    /// flagstat reports
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(Args)]
struct FastqNamesCmd {
    samplesheet: PathBuf,

    /// Folder of generated FASTQ files to compare with
    #[arg(short = 'd', long)]
    fastq_folder: Option<PathBuf>,

    /// Exit with an error if the folder does not match the prediction
    #[arg(short = 'x', long)]
    exit_with_error: bool,

    #[arg(short = 't', long, value_enum, default_value_t = SequencingType::PairedEnd)]
    sequencing_type: SequencingType,

    /// Comma separated lanes to impute, e.g. 1,2
    #[arg(short = 'I', long)]
    impute_lanes: Option<String>,
}

#[derive(Args)]
struct SamplingArgs {
    /// Random sampling rate, e.g. .1 keeps around 10%
    #[arg(short = 's', long)]
    samplerate: Option<f64>,

    /// Seed for the sampler (default: random)
    #[arg(long)]
    seed: Option<u64>,
}

impl SamplingArgs {
    fn rng(&self) -> SmallRng {
        SmallRng::seed_from_u64(self.seed.unwrap_or_else(rand::random))
    }
}

#[derive(Args)]
struct TagsToFastaCmd {
    /// One record per unique tag, with count= in the header
    #[arg(short = 'u', long)]
    unique: bool,

    #[command(flatten)]
    sampling: SamplingArgs,

    #[arg(short = 'm', long)]
    minimum_count: Option<u64>,

    #[arg(short = 'M', long)]
    maximum_count: Option<u64>,
}

#[derive(Args)]
struct TagsToTagsCmd {
    #[command(flatten)]
    sampling: SamplingArgs,
}

fn spinner(color: &str, msg: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let template = format!("{{spinner:.{}}} {{msg}}", color);
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
        .template(&template)
    {
        spinner.set_style(style);
    }
    spinner.set_message(msg.to_string());
    spinner
}

fn stdout_err(e: io::Error) -> PrismError {
    PrismError::io("<stdout>", e)
}

impl BuildCmd {
    fn try_execute(&self) -> Result<()> {
        let params = BuildParams {
            inputs: self.inputs.clone(),
            weighting: self.weighting_method,
            columns: ColumnSelection {
                query: self.query_column,
                locus: self.locus_column,
                min_fields: self.min_fields,
            },
            strict_grouping: self.strict_grouping,
            separate: self.separate,
            output: self.output.clone(),
        };

        let progress = spinner("green", &format!("Building distribution from {} report(s)...", self.inputs.len()));
        let summaries = build_sample_distribution(&params);
        progress.finish_and_clear();

        let mut out = BufWriter::new(io::stdout().lock());
        for summary in summaries? {
            out.write_all(summary.get_report().as_bytes()).map_err(stdout_err)?;
        }
        out.flush().map_err(stdout_err)
    }
}

impl TableCmd {
    fn try_execute(&self) -> Result<()> {
        let params = TableParams {
            artifacts: self.artifacts.clone(),
            measure: self.measure,
            rownames: self.rownames,
        };
        let progress = spinner("blue", &format!("Loading {} distribution(s)...", self.artifacts.len()));
        let table = build_summary_table(&params);
        progress.finish_and_clear();

        let mut out = BufWriter::new(io::stdout().lock());
        table?.write_tsv(&mut out).map_err(stdout_err)?;
        out.flush().map_err(stdout_err)
    }
}

impl MappingStatsCmd {
    fn try_execute(&self) -> Result<()> {
        let rates = collate_mapping_stats(self.files.as_slice())?;
        print!("{}", get_mapping_table(&rates));
        Ok(())
    }
}

impl FastqNamesCmd {
    fn try_execute(&self) -> Result<()> {
        let options = FastqNameOptions {
            sequencing_type: self.sequencing_type,
            impute_lanes: self.impute_lanes.as_deref().map(parse_lane_list).transpose()?,
        };
        let sheet = locus_prism::input::open_text(&self.samplesheet)?;
        let predicted = predict_fastq_names(sheet, &options)?;
        for name in &predicted {
            println!("{}", name);
        }

        if let Some(folder) = &self.fastq_folder {
            let cmp = compare_with_folder(&predicted, folder)?;
            if !cmp.missing.is_empty() {
                eprintln!(
                    "the following files expected from the sample sheet were not found in {}",
                    folder.display()
                );
                for name in &cmp.missing {
                    eprintln!("{}", name);
                }
            }
            if !cmp.unexpected.is_empty() {
                eprintln!("the following unexpected files were found in {}", folder.display());
                for name in &cmp.unexpected {
                    eprintln!("{}", name);
                }
            }
            if !cmp.is_match() && self.exit_with_error {
                return Err(PrismError::InvalidArgument(format!(
                    "{} does not match the sample sheet",
                    folder.display()
                )));
            }
        }
        Ok(())
    }
}

impl TagsToFastaCmd {
    fn try_execute(&self) -> Result<()> {
        let options = FastaOptions {
            unique: self.unique,
            sample_rate: SampleRate(self.sampling.samplerate),
            minimum_count: self.minimum_count,
            maximum_count: self.maximum_count,
        };
        let mut rng = self.sampling.rng();
        let mut out = BufWriter::new(io::stdout().lock());
        let stats = tags_to_fasta(io::stdin().lock(), &mut out, &options, &mut rng)?;
        out.flush().map_err(stdout_err)?;
        log::info!("{} tags read, {} fasta records written", stats.tags, stats.records);
        Ok(())
    }
}

impl TagsToTagsCmd {
    fn try_execute(&self) -> Result<()> {
        let mut rng = self.sampling.rng();
        let mut out = BufWriter::new(io::stdout().lock());
        let stats = tags_to_tags(io::stdin().lock(), &mut out, SampleRate(self.sampling.samplerate), &mut rng)?;
        out.flush().map_err(stdout_err)?;
        log::info!("{} of {} tag lines kept", stats.records, stats.tags);
        Ok(())
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Build(cmd) => cmd.try_execute(),
        Commands::Table(cmd) => cmd.try_execute(),
        Commands::MappingStats(cmd) => cmd.try_execute(),
        Commands::FastqNames(cmd) => cmd.try_execute(),
        Commands::TagsToFasta(cmd) => cmd.try_execute(),
        Commands::TagsToTags(cmd) => cmd.try_execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
