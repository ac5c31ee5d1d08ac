//! `gpuwatch fields`: the field catalog with default selection and
//! conversion factors.

use std::io::Write;

use gpuwatch_core::{FieldId, UnitConversionTable, default_fields};

use crate::error::CliError;

pub fn handle(out: &mut impl Write) -> Result<(), CliError> {
    let defaults = default_fields();
    let factors = UnitConversionTable::curated();

    writeln!(out, "{:>4}  {:<28} {:<9} DESCRIPTION", "ID", "NAME", "FACTOR")?;
    for desc in FieldId::catalog() {
        let marker = if defaults.contains(&desc.id) { "*" } else { " " };
        let factor = factors
            .factor(desc.id)
            .map_or_else(|| "-".to_owned(), |f| f.to_string());
        writeln!(
            out,
            "{:>4}{marker} {:<28} {factor:<9} {}",
            desc.id.raw(),
            desc.name,
            desc.description
        )?;
    }
    writeln!(out, "\n* watched by default")?;
    Ok(())
}
