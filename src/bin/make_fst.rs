
use fst::SetBuilder;

use std::fs::File;
use std::io::BufWriter;
use std::time::Instant;

use std::path::PathBuf;
use structopt::StructOpt;

use balda::dictionary::parse_word_list;
use balda::NormalizationMode;

#[derive(Debug, StructOpt)]
#[structopt(name = "make_fst", about = "Compile a word list into a fst file, for faster dictionary loading")]
struct Opt {
    /// The input list. One word per line, lines with anything but letters are skipped
    #[structopt(short = "i", long = "input-list", parse(from_os_str))]
    list_file: PathBuf,

    /// Where to write the compiled dictionary
    #[structopt(short = "o", long = "output-fst", parse(from_os_str))]
    fst_file: PathBuf,

    /// Read Ё as Е, for games played with that rule
    #[structopt(long = "fold-yo")]
    fold_yo: bool,
}

fn main() {
    simple_logger::SimpleLogger::new().with_level(log::LevelFilter::Info).init().unwrap();

    let Opt {
        list_file,
        fst_file,
        fold_yo,
    } = Opt::from_args();
    let mode = if fold_yo {
        NormalizationMode::FoldYo
    } else {
        NormalizationMode::Exact
    };

    let start = Instant::now();
    let text = std::fs::read_to_string(list_file).expect("reading the words list file");
    let mut words = parse_word_list(&text, mode).collect::<Vec<_>>();
    log::info!("{} words loaded in {:?}", words.len(), Instant::now() - start);

    let start = Instant::now();
    words.sort_unstable();
    words.dedup();
    log::info!("{} distinct words sorted in {:?}", words.len(), Instant::now() - start);

    let start = Instant::now();
    let wtr = BufWriter::new(File::create(fst_file).expect("create the words fst file"));
    let mut build = SetBuilder::new(wtr).expect("builder writing to fst file");
    build.extend_iter(words).expect("words are sorted and distinct");
    build.finish().expect("finishing the fst file");
    log::info!("dictionary written in {:?}", Instant::now() - start);
}
