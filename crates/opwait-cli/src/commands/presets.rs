// Presets listing command

use anyhow::Result;
use opwait_core::{OperationKind, OperationPreset};

use crate::output::{print_table_header, print_table_row, OutputFormat};

pub fn run(output: OutputFormat) -> Result<()> {
    let presets: Vec<OperationPreset> = OperationKind::ALL
        .into_iter()
        .map(OperationKind::preset)
        .collect();

    if !output.is_text() {
        return output.print_value(&serde_json::json!({ "data": presets, "total": presets.len() }));
    }

    print_table_header(&[
        ("NAME", 20),
        ("STATUS PATH", 34),
        ("COMPLETE", 24),
        ("ERROR", 26),
        ("ATTEMPTS", 8),
        ("INTERVAL", 8),
    ]);

    for preset in &presets {
        let path = preset.status_path.to_string();
        let complete = preset.policy.completion_states.to_string();
        let error = preset.policy.error_states.to_string();
        let attempts = preset.policy.max_attempts.to_string();
        let interval = format!("{}s", preset.policy.interval.as_secs());

        print_table_row(&[
            (preset.kind.name(), 20),
            (&path, 34),
            (&complete, 24),
            (&error, 26),
            (&attempts, 8),
            (&interval, 8),
        ]);
    }

    Ok(())
}
