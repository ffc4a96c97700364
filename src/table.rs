// src/table.rs
//
// Sampling table: one row of spatial averages per save-worthy tick.
//
// Per tick the owner calls `arm` before running the pipeline and `sample`
// after it. `arm` marks every column wanted in the save cache; the pipeline
// publishes those values as a side effect of the evaluation it was doing
// anyway; `sample` then reads them back. A tick that was not armed leaves the
// table untouched.

use serde::Serialize;

use crate::error::{EngineError, Result};
use crate::quantity::{QuantityId, SaveCache};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    /// Simulation time (s).
    pub t: f64,
    /// Spatial average of each column, in column order.
    pub values: Vec<[f64; 3]>,
}

#[derive(Debug)]
pub struct Table {
    columns: Vec<QuantityId>,
    rows: Vec<TableRow>,
    /// Autosave period (s); `None` disables autosaving.
    period: Option<f64>,
    /// Time of the first row written since autosave was (re)enabled.
    start: Option<f64>,
    /// Rows written since `start`.
    saved: usize,
    force: bool,
    armed: bool,
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

impl Table {
    /// Table with the single default column `m`.
    pub fn new() -> Self {
        Self {
            columns: vec![QuantityId::M],
            rows: Vec::new(),
            period: None,
            start: None,
            saved: 0,
            force: false,
            armed: false,
        }
    }

    /// Append a column. Only vector quantities can be tabulated; adding a
    /// column twice is a no-op.
    pub fn add(&mut self, id: QuantityId) -> Result<()> {
        if id.ncomp() != 3 {
            return Err(EngineError::InvalidConfig(format!(
                "table column {} must have 3 components, has {}",
                id.name(),
                id.ncomp()
            )));
        }
        if !self.columns.contains(&id) {
            self.columns.push(id);
        }
        Ok(())
    }

    pub fn columns(&self) -> &[QuantityId] {
        &self.columns
    }

    /// Column titles with units, starting with time.
    pub fn header(&self) -> Vec<String> {
        let mut h = vec!["t (s)".to_string()];
        for id in &self.columns {
            let info = id.info();
            h.push(format!("{} ({})", info.name, info.unit));
        }
        h
    }

    /// Save a row on the next save-worthy tick, then whenever
    /// `time - start >= period * rows_since_start`, where `start` is the time
    /// of that first row. A period of zero saves on every save-worthy
    /// evaluation.
    pub fn autosave(&mut self, period: f64) -> Result<()> {
        if !(period >= 0.0) || !period.is_finite() {
            return Err(EngineError::InvalidConfig(format!(
                "table autosave period must be >= 0, got {period}"
            )));
        }
        self.period = Some(period);
        self.start = None;
        self.saved = 0;
        Ok(())
    }

    pub fn disable_autosave(&mut self) {
        self.period = None;
        self.start = None;
        self.saved = 0;
    }

    pub fn autosave_period(&self) -> Option<f64> {
        self.period
    }

    /// Make the next save-worthy tick write a row regardless of the period.
    pub fn force_next(&mut self) {
        self.force = true;
    }

    fn due(&self, time: f64) -> bool {
        if self.force {
            return true;
        }
        match (self.period, self.start) {
            (Some(p), Some(start)) => time - start >= p * self.saved as f64,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    /// Mark every column wanted for this tick if a row is due.
    pub fn arm(&mut self, cansave: bool, time: f64, cache: &mut SaveCache) {
        self.armed = cansave && self.due(time);
        if self.armed {
            for &id in &self.columns {
                cache.want(id);
            }
        }
    }

    /// Append a row from the values published this tick, if armed.
    pub fn sample(&mut self, cansave: bool, time: f64, cache: &SaveCache) -> Result<()> {
        if !(cansave && self.armed) {
            return Ok(());
        }
        self.armed = false;

        let mut values = Vec::with_capacity(self.columns.len());
        for &id in &self.columns {
            let field = cache
                .latest(id)
                .ok_or(EngineError::StaleColumn(id.name()))?;
            values.push(field.average());
        }
        log::debug!("table row t={time:.6e} {values:?}");
        self.rows.push(TableRow { t: time, values });
        self.force = false;
        if self.period.is_some() {
            self.start.get_or_insert(time);
            self.saved += 1;
        }
        Ok(())
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn last(&self) -> Option<&TableRow> {
        self.rows.last()
    }

    /// Index of `id` among the columns.
    pub fn column_index(&self, id: QuantityId) -> Option<usize> {
        self.columns.iter().position(|&c| c == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh;
    use crate::vector_field::VectorField;

    fn field(v: [f64; 3]) -> VectorField {
        let mut f = VectorField::new(Mesh::new(2, 1, 1, 1.0, 1.0, 1.0).unwrap());
        f.set_uniform(v);
        f
    }

    #[test]
    fn regions_cannot_be_a_column() {
        let mut t = Table::new();
        assert!(t.add(QuantityId::Regions).is_err());
        t.add(QuantityId::BEff).unwrap();
        t.add(QuantityId::BEff).unwrap();
        assert_eq!(t.columns(), &[QuantityId::M, QuantityId::BEff]);
        assert_eq!(t.header()[2], "B_eff (T)");
    }

    #[test]
    fn unarmed_tick_writes_nothing() {
        let mut t = Table::new();
        let mut cache = SaveCache::new();
        cache.begin_tick(1);
        t.arm(true, 0.0, &mut cache);
        assert!(!cache.wants(QuantityId::M));
        t.sample(true, 0.0, &cache).unwrap();
        assert!(t.rows().is_empty());
    }

    #[test]
    fn armed_tick_reads_published_values() {
        let mut t = Table::new();
        t.autosave(0.0).unwrap();
        let mut cache = SaveCache::new();
        cache.begin_tick(1);
        t.arm(true, 0.0, &mut cache);
        assert!(cache.wants(QuantityId::M));
        cache.publish(QuantityId::M, &field([0.0, 0.0, 1.0]));
        t.sample(true, 0.0, &cache).unwrap();
        assert_eq!(t.last().unwrap().values, vec![[0.0, 0.0, 1.0]]);

        // Stage-2 evaluations never save.
        cache.begin_tick(2);
        t.arm(false, 1e-12, &mut cache);
        t.sample(false, 1e-12, &cache).unwrap();
        assert_eq!(t.rows().len(), 1);
    }

    #[test]
    fn missing_value_is_reported() {
        let mut t = Table::new();
        t.force_next();
        let mut cache = SaveCache::new();
        cache.begin_tick(1);
        t.arm(true, 0.0, &mut cache);
        let err = t.sample(true, 0.0, &cache).unwrap_err();
        assert!(matches!(err, EngineError::StaleColumn("m")));
    }

    #[test]
    fn period_spaces_out_rows() {
        let mut t = Table::new();
        t.autosave(1e-9).unwrap();
        let mut cache = SaveCache::new();
        let m = field([1.0, 0.0, 0.0]);
        let mut tick = 0;
        for time in [0.0, 0.4e-9, 0.8e-9, 1.2e-9, 1.6e-9, 2.0e-9] {
            tick += 1;
            cache.begin_tick(tick);
            t.arm(true, time, &mut cache);
            cache.publish(QuantityId::M, &m);
            t.sample(true, time, &cache).unwrap();
        }
        let times: Vec<f64> = t.rows().iter().map(|r| r.t).collect();
        assert_eq!(times, vec![0.0, 1.2e-9, 2.0e-9]);
    }

    #[test]
    fn period_counts_from_when_autosave_was_enabled() {
        let mut t = Table::new();
        let mut cache = SaveCache::new();
        let m = field([1.0, 0.0, 0.0]);
        let mut tick = 0;
        let mut tick_at = |t: &mut Table, time: f64| {
            tick += 1;
            cache.begin_tick(tick);
            t.arm(true, time, &mut cache);
            cache.publish(QuantityId::M, &m);
            t.sample(true, time, &cache).unwrap();
        };

        tick_at(&mut t, 5e-9);
        assert!(t.rows().is_empty());

        t.autosave(1e-9).unwrap();
        for time in [20e-9, 20.5e-9, 20.9e-9, 21.1e-9, 21.8e-9, 22.3e-9] {
            tick_at(&mut t, time);
        }
        let times: Vec<f64> = t.rows().iter().map(|r| r.t).collect();
        assert_eq!(times, vec![20e-9, 21.1e-9, 22.3e-9]);

        // Re-enabling restarts the count at the next row.
        t.autosave(10e-9).unwrap();
        tick_at(&mut t, 22.5e-9);
        tick_at(&mut t, 23.0e-9);
        assert_eq!(t.rows().len(), 4);
        assert_eq!(t.last().unwrap().t, 22.5e-9);
    }

    #[test]
    fn negative_period_is_rejected() {
        let mut t = Table::new();
        assert!(t.autosave(-1.0).is_err());
        assert!(t.autosave(f64::NAN).is_err());
    }
}
