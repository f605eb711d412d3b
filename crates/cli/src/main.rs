//! CLI tool for listing and dumping VBA macro source from Office documents.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use vbadump_archive::ArchiveReader;
use vbadump_core::{
    decode_windows_1252, EntryScanner, Error as CoreError, InputFormat, ScanMode, ScanOutcome,
    ScanReport,
};
use vbadump_ole::OleReader;

/// List the entries of an Office compound file and dump its VBA macro source.
#[derive(Parser, Debug)]
#[command(name = "vbadump")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input file: a compound file (.doc, .xls, vbaProject.bin) or a zip archive (.docm, .xlsm)
    #[arg(long = "olefilepath", value_name = "PATH")]
    ole_file_path: PathBuf,

    /// Entry number to dump; 0 lists every entry
    #[arg(long, default_value = "0")]
    select: usize,

    /// Print the listing as JSON
    #[arg(long)]
    json: bool,

    /// Transcode the dumped source from Windows-1252 to UTF-8
    #[arg(long)]
    utf8: bool,

    /// Write the dumped source to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// A compound file to scan, with a label for listings.
#[derive(Debug)]
struct CompoundSource {
    label: String,
    bytes: Vec<u8>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let scanner = EntryScanner::new().with_mode(ScanMode::from_selection(args.select));
    let (format, sources) = load_compound_files(&args.ole_file_path)?;

    match scan_sources(&scanner, format, &sources)? {
        ScanResult::Listings(reports) => print_listing(&reports, args.json)?,
        ScanResult::Dump(dump) => write_dump(&dump, &args)?,
    }

    Ok(())
}

/// What scanning every compound file produced.
#[derive(Debug)]
enum ScanResult {
    /// One report per compound file that could be read.
    Listings(Vec<ScanReport>),
    /// Recovered source of entry N, concatenated across compound files.
    Dump(Vec<u8>),
}

/// Scan or dump every compound file with `scanner`.
///
/// Archive members that fail to open are skipped. A dump fails when no
/// compound file yields source for the selected entry.
fn scan_sources(
    scanner: &EntryScanner,
    format: InputFormat,
    sources: &[CompoundSource],
) -> Result<ScanResult> {
    let mut reports = Vec::new();
    let mut dump = Vec::new();
    let mut dumped = 0usize;
    let mut last_miss: Option<CoreError> = None;

    for source in sources {
        log::debug!("Scanning {}", source.label);

        let entries = match OleReader::new().read_entries(Cursor::new(&source.bytes)) {
            Ok(entries) => entries,
            // Archive members are scanned independently.
            Err(e) if format == InputFormat::Zip => {
                log::warn!("Skipping {}: {}", source.label, e);
                continue;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", source.label));
            }
        };

        match scanner.run(&source.label, &entries) {
            Ok(ScanOutcome::Listing(report)) => reports.push(report),
            Ok(ScanOutcome::Dumped { index, source: code }) => {
                log::debug!("Recovered {} bytes from entry {}", code.len(), index);
                dump.extend_from_slice(&code);
                dumped += 1;
            }
            Err(e @ (CoreError::EntryNotFound { .. } | CoreError::NoMacroSource { .. })) => {
                log::debug!("{}: {}", source.label, e);
                last_miss = Some(e);
            }
            Err(e) => {
                anyhow::bail!("Could not decompress item selected: {}", e);
            }
        }
    }

    match scanner.mode() {
        ScanMode::List => Ok(ScanResult::Listings(reports)),
        ScanMode::Dump(_) => {
            if dumped == 0 {
                let reason = last_miss
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "no compound file could be read".to_string());
                anyhow::bail!("Could not decompress item selected: {}", reason);
            }
            Ok(ScanResult::Dump(dump))
        }
    }
}

/// Read the input file and collect the compound files to scan.
fn load_compound_files(path: &Path) -> Result<(InputFormat, Vec<CompoundSource>)> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to open {}", path.display()))?;
    compound_sources(path, bytes)
}

/// Split the input bytes into the compound files to scan.
///
/// A zip archive yields every embedded compound file in member order; any
/// other input is treated as a compound file itself.
fn compound_sources(path: &Path, bytes: Vec<u8>) -> Result<(InputFormat, Vec<CompoundSource>)> {
    let format = InputFormat::from_magic(&bytes)
        .or_else(|| {
            path.extension()
                .and_then(|e| e.to_str())
                .and_then(InputFormat::from_extension)
        })
        .unwrap_or(InputFormat::CompoundFile);

    let sources = match format {
        InputFormat::Zip => {
            log::debug!("Unwrapping zip archive");
            let files = ArchiveReader::new()
                .embedded_compound_files(Cursor::new(bytes))
                .with_context(|| format!("Failed to read archive {}", path.display()))?;

            if files.is_empty() {
                anyhow::bail!("No compound file found inside {}", path.display());
            }

            files
                .into_iter()
                .map(|f| CompoundSource {
                    label: f.name,
                    bytes: f.bytes,
                })
                .collect()
        }
        InputFormat::CompoundFile => vec![CompoundSource {
            label: path.display().to_string(),
            bytes,
        }],
    };

    Ok((format, sources))
}

/// Print one listing per compound file.
fn print_listing(reports: &[ScanReport], json: bool) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if json {
        serde_json::to_writer_pretty(&mut out, reports).context("Failed to write JSON listing")?;
        writeln!(out)?;
        return Ok(());
    }

    for report in reports {
        if reports.len() > 1 {
            writeln!(out, "# {}", report.source)?;
        }
        write!(out, "{}", report.listing())?;
    }

    Ok(())
}

/// Bytes to emit for a dump: optionally transcoded, and newline-terminated
/// when written to a terminal stream.
fn dump_bytes(source: &[u8], utf8: bool, terminate: bool) -> Vec<u8> {
    let mut bytes = if utf8 {
        decode_windows_1252(source).into_bytes()
    } else {
        source.to_vec()
    };
    if terminate {
        bytes.push(b'\n');
    }
    bytes
}

/// Write the recovered source to stdout or the output file.
///
/// Files receive the recovered bytes unchanged; stdout gets a trailing
/// newline.
fn write_dump(source: &[u8], args: &Args) -> Result<()> {
    match &args.output {
        Some(path) => {
            write_output(path, &dump_bytes(source, args.utf8, false))?;
            if args.verbose {
                eprintln!("Written to: {}", path.display());
            }
        }
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            out.write_all(&dump_bytes(source, args.utf8, true))
                .context("Failed to write to stdout")?;
            out.flush()?;
        }
    }

    Ok(())
}

/// Write output to a file.
fn write_output(path: &Path, content: &[u8]) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;

    file.write_all(content)
        .with_context(|| format!("Failed to write to {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfb::CompoundFile;
    use vbadump_core::types::COMPOUND_FILE_MAGIC;
    use zip::write::FileOptions;
    use zip::{CompressionMethod, ZipWriter};

    /// Literal-only compressed container for `text`.
    fn literal_container(text: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        for group in text.chunks(8) {
            data.push(0x00);
            data.extend_from_slice(group);
        }
        let header = 0xB000u16 | (data.len() as u16 - 1);

        let mut out = vec![0x01];
        out.extend_from_slice(&header.to_le_bytes());
        out.extend_from_slice(&data);
        out
    }

    /// Module stream: performance cache bytes, then the compressed source.
    fn module_stream(source: &[u8]) -> Vec<u8> {
        let mut stream = vec![0xCCu8; 8];
        stream.extend_from_slice(&literal_container(source));
        stream
    }

    /// Compound file with `/VBA` (entry 1) and `/VBA/Module1` (entry 2).
    fn build_compound_file(module: Vec<u8>) -> Vec<u8> {
        let mut cfb = CompoundFile::create(Cursor::new(Vec::new())).unwrap();
        cfb.create_storage("/VBA").unwrap();
        let mut stream = cfb.create_stream("/VBA/Module1").unwrap();
        stream.write_all(&module).unwrap();
        stream.flush().unwrap();
        drop(stream);
        cfb.flush().unwrap();
        cfb.into_inner().into_inner()
    }

    fn build_zip(members: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Stored);

        for (name, data) in members {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }

        writer.finish().unwrap().into_inner()
    }

    /// Compound file magic followed by garbage that `cfb` cannot open.
    fn broken_compound_file() -> Vec<u8> {
        let mut bytes = COMPOUND_FILE_MAGIC.to_vec();
        bytes.extend_from_slice(&[0u8; 508]);
        bytes
    }

    fn docm_with_two_projects() -> Vec<u8> {
        let first = build_compound_file(module_stream(
            b"Attribute VB_Name = \"First\"\r\nSub First()\r\nEnd Sub\r\n",
        ));
        let second = build_compound_file(module_stream(
            b"Attribute VB_Name = \"Second\"\r\nSub Second()\r\nEnd Sub\r\n",
        ));
        let broken = broken_compound_file();

        build_zip(&[
            ("[Content_Types].xml", b"<Types/>".as_slice()),
            ("word/vbaProject.bin", first.as_slice()),
            ("word/broken.bin", broken.as_slice()),
            ("word/vbaProject2.bin", second.as_slice()),
        ])
    }

    fn scanner(select: usize) -> EntryScanner {
        EntryScanner::new().with_mode(ScanMode::from_selection(select))
    }

    #[test]
    fn test_zip_dump_concatenates_every_project() {
        let (format, sources) =
            compound_sources(Path::new("report.docm"), docm_with_two_projects()).unwrap();
        assert_eq!(format, InputFormat::Zip);
        assert_eq!(sources.len(), 3);

        let result = scan_sources(&scanner(2), format, &sources).unwrap();
        match result {
            ScanResult::Dump(dump) => assert_eq!(
                dump,
                b"Attribute VB_Name = \"First\"\nSub First()\nEnd Sub\n\
                  Attribute VB_Name = \"Second\"\nSub Second()\nEnd Sub\n"
                    .to_vec()
            ),
            other => panic!("expected a dump, got {:?}", other),
        }
    }

    #[test]
    fn test_zip_listing_skips_unreadable_member() {
        let (format, sources) =
            compound_sources(Path::new("report.docm"), docm_with_two_projects()).unwrap();

        let result = scan_sources(&scanner(0), format, &sources).unwrap();
        let ScanResult::Listings(reports) = result else {
            panic!("expected listings");
        };

        let labels: Vec<_> = reports.iter().map(|r| r.source.as_str()).collect();
        assert_eq!(labels, vec!["word/vbaProject.bin", "word/vbaProject2.bin"]);
        for report in &reports {
            assert_eq!(report.entries.len(), 2);
            assert_eq!(report.macro_entries().count(), 1);
            assert_eq!(report.entries[1].name, "Module1");
        }
    }

    #[test]
    fn test_zip_dump_without_macro_entry_fails() {
        let (format, sources) =
            compound_sources(Path::new("report.docm"), docm_with_two_projects()).unwrap();

        let err = scan_sources(&scanner(1), format, &sources).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Could not decompress item selected"));
        assert!(message.contains("holds no VBA source"));

        let err = scan_sources(&scanner(9), format, &sources).unwrap_err();
        assert!(err.to_string().contains("Entry 9 not found"));
    }

    #[test]
    fn test_zip_with_only_broken_members_fails_dump() {
        let broken = broken_compound_file();
        let zip = build_zip(&[("word/vbaProject.bin", broken.as_slice())]);
        let (format, sources) = compound_sources(Path::new("report.docm"), zip).unwrap();

        let err = scan_sources(&scanner(2), format, &sources).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Could not decompress item selected: no compound file could be read"
        );
    }

    #[test]
    fn test_zip_without_compound_file_is_rejected() {
        let zip = build_zip(&[("word/document.xml", b"<w:document/>".as_slice())]);
        let err = compound_sources(Path::new("report.docx"), zip).unwrap_err();
        assert!(err.to_string().starts_with("No compound file found inside"));
    }

    #[test]
    fn test_corrupt_source_fails_dump() {
        let mut module = vec![0xCCu8; 4];
        module.push(0x01);
        module.extend_from_slice(&0xBFFFu16.to_le_bytes());
        module.extend_from_slice(b"\x00Attribut\x00e VB");

        let bytes = build_compound_file(module);
        let (format, sources) = compound_sources(Path::new("vbaProject.bin"), bytes).unwrap();
        assert_eq!(format, InputFormat::CompoundFile);

        let err = scan_sources(&scanner(2), format, &sources).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Could not decompress item selected: Decompression error"));
    }

    #[test]
    fn test_unrecognized_input_is_read_as_compound_file() {
        let (format, sources) =
            compound_sources(Path::new("notes.txt"), b"plain text".to_vec()).unwrap();
        assert_eq!(format, InputFormat::CompoundFile);
        assert_eq!(sources[0].label, "notes.txt");

        let err = scan_sources(&scanner(0), format, &sources).unwrap_err();
        assert_eq!(err.to_string(), "Failed to read notes.txt");
        assert!(format!("{:#}", err).contains("OLE/CFB error"));
    }

    #[test]
    fn test_dump_bytes() {
        let source = b"MsgBox \"\x93Hi\x94\"";
        assert_eq!(dump_bytes(source, false, false), source.to_vec());
        assert_eq!(
            dump_bytes(source, true, true),
            "MsgBox \"\u{201C}Hi\u{201D}\"\n".as_bytes().to_vec()
        );
    }
}
