#![no_main]

use libfuzzer_sys::fuzz_target;
use cilflow::{
    analysis::{AnalysisConfig, MethodAnalysis},
    metadata::resolver::NullResolver,
};

fuzz_target!(|data: &[u8]| {
    // path count grows exponentially with the number of branches
    if data.len() > 512 {
        return;
    }

    let config = AnalysisConfig::default();
    if let Ok(analysis) = MethodAnalysis::analyze(data, &[], &NullResolver, &config) {
        for instruction in analysis.instructions() {
            let _ = analysis.describe(instruction.offset());
        }
        let _ = analysis.statement_listing();
    }
});
