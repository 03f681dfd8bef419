//! Generate (or verify) the firmware LED map from a KiCad PCB file.
//!
//! ```text
//! ledmap                      # docs/kwal25.kicad_pcb -> sdroot/ledmap.bin
//! ledmap --verify             # compare against the existing ledmap.bin
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use kwal_csv_server::ledmap::{self, Center, DEFAULT_CENTER, EXPECTED_LEDS, RECORD_SIZE};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about = "Convert WS2812 footprint positions into the firmware LED map")]
struct Cli {
    /// KiCad PCB file to read
    #[arg(long, default_value = "docs/kwal25.kicad_pcb")]
    pcb: PathBuf,
    /// Binary LED map to write (or verify)
    #[arg(long, default_value = "sdroot/ledmap.bin")]
    out: PathBuf,
    /// Dome origin X in KiCad coordinates
    #[arg(long, default_value_t = DEFAULT_CENTER.x)]
    center_x: f64,
    /// Dome origin Y in KiCad coordinates
    #[arg(long, default_value_t = DEFAULT_CENTER.y)]
    center_y: f64,
    /// Number of LEDs expected on the board (mismatch only warns)
    #[arg(long, default_value_t = EXPECTED_LEDS)]
    expected: usize,
    /// Verify the existing map instead of writing it
    #[arg(long)]
    verify: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let center = Center {
        x: cli.center_x,
        y: cli.center_y,
    };

    let pcb = fs::read_to_string(&cli.pcb)
        .with_context(|| format!("failed to read {}", cli.pcb.display()))?;
    let leds = ledmap::extract_leds(&pcb)
        .with_context(|| format!("failed to parse {}", cli.pcb.display()))?;
    println!(
        "Extracted {} WS2812 LEDs from {}",
        leds.len(),
        cli.pcb.display()
    );
    if leds.len() != cli.expected {
        eprintln!("WARNING: expected {}, got {}", cli.expected, leds.len());
    }

    if cli.verify {
        let table = fs::read(&cli.out)
            .with_context(|| format!("failed to read {} for verification", cli.out.display()))?;
        let report = ledmap::verify(&leds, center, &table);
        for mismatch in &report.mismatches {
            println!(
                "  MISMATCH LED {} (D{}): err={:.4}",
                mismatch.index, mismatch.number, mismatch.error
            );
        }
        println!("Max error: {:.6}", report.max_error);
        if report.missing > 0 {
            bail!(
                "{} is truncated: {} LED records missing",
                cli.out.display(),
                report.missing
            );
        }
        if !report.is_ok() {
            bail!("{} mismatches", report.mismatches.len());
        }
        println!("VERIFIED - all positions match");
        return Ok(());
    }

    let table = ledmap::encode(&leds, center);
    if let Some(parent) = cli.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(&cli.out, &table)
        .with_context(|| format!("failed to write {}", cli.out.display()))?;
    println!(
        "Written {} LED positions to {} ({} bytes)",
        leds.len(),
        cli.out.display(),
        leds.len() * RECORD_SIZE
    );
    Ok(())
}
