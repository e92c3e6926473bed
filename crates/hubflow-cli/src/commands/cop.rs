use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use hubflow_core::{ConversionModel, DispatchConfig, HeatPump};
use tabwriter::TabWriter;

pub fn handle(config: Option<&Path>) -> Result<()> {
    let config = match config {
        Some(path) => DispatchConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => DispatchConfig::default(),
    };
    let model = config
        .conversion_model()
        .context("evaluating conversion coefficients")?;
    let table = render(&model)?;
    print!("{table}");
    Ok(())
}

pub fn render(model: &ConversionModel) -> Result<String> {
    let mut writer = TabWriter::new(Vec::new());
    writeln!(writer, "HEAT PUMP\tCONDENSER\tEVAPORATOR\tCOP")?;
    for hp in HeatPump::ALL {
        let (t_cond, t_evap) = hp.temperatures(model.temperatures());
        let cop = model.cop(hp);
        let note = if cop < 0.0 { "\t(negative)" } else { "" };
        writeln!(writer, "{hp}\t{t_cond}\t{t_evap}\t{cop:.4}{note}")?;
    }
    writeln!(writer)?;
    writeln!(writer, "CONVERSION\tRATIO")?;
    for rule in model.rules().iter().filter(|rule| rule.reference.is_none()) {
        writeln!(writer, "{}\t{:.4}", rule.technology, rule.coefficient)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("flushing table: {err}"))?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_lists_heat_pumps_and_ratios() {
        let table = render(&ConversionModel::default()).unwrap();
        assert!(table.contains("hp_heat_ht"));
        assert!(table.contains("2.5684"));
        assert!(table.contains("p2g"));
        assert!(!table.contains("negative"));
    }
}
