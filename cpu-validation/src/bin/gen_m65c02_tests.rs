//! Generate gzipped JSON reference vectors for the M65C02 interpreter.
//!
//! One file per documented opcode under `test_data/m65c02/`, in the format
//! consumed by `tests/m65c02_single_step_test.rs`. Regenerate after any
//! intentional behavior change and diff the vectors to review the impact.

use std::fs;
use std::io::Write;
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;
use glint_cpu_validation::{DOCUMENTED_OPCODES, generate_case};
use rand::SeedableRng;
use rand::rngs::StdRng;

const CASES_PER_OPCODE: u32 = 200;
const SEED: u64 = 0x4C59_4E58; // "LYNX"

fn main() {
    let out_dir = Path::new("test_data/m65c02");
    fs::create_dir_all(out_dir).expect("failed to create test_data/m65c02");

    let mut rng = StdRng::seed_from_u64(SEED);
    let mut total = 0usize;

    for &opcode in DOCUMENTED_OPCODES {
        let cases: Vec<_> = (0..CASES_PER_OPCODE)
            .map(|i| generate_case(opcode, i, &mut rng))
            .collect();

        let json = serde_json::to_string(&cases).expect("serialization failed");
        let path = out_dir.join(format!("{opcode:02x}.json.gz"));
        let file = fs::File::create(&path).expect("failed to create vector file");
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder
            .write_all(json.as_bytes())
            .expect("failed to write vector file");
        encoder.finish().expect("failed to finish vector file");

        total += cases.len();
    }

    println!(
        "wrote {total} cases across {} opcode files to {}",
        DOCUMENTED_OPCODES.len(),
        out_dir.display()
    );
}
