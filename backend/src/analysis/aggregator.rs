//! Aggregations over a classified migration table.
//!
//! [`MigrationView`] classifies rows and filters columns once, then answers
//! the four chart queries by looking rows up in those indices:
//!
//! 1. [`MigrationView::total_series`] - yearly totals and balance
//! 2. [`MigrationView::top_by_year`] - top arrivals / departures of a year
//! 3. [`MigrationView::top_by_peak_balance`] - entities with the largest
//!    absolute yearly balance
//! 4. [`MigrationView::balance_series`] - those entities' balance per year
//!
//! Everything borrows the table immutably; a view can be queried repeatedly
//! and from several threads.

use crate::config::{EngineConfig, TotalsScope};
use crate::models::{
    BalancePoint, Direction, EntitySeries, PeakBalance, RankedEntity, RawTable, TotalPoint,
    YearFact, YearRankings,
};

use super::classifier::{classify, RowIndex};
use super::columns::{display_name, EntityMask};
use super::numeric::{number_or_zero, parse_number};

/// A migration table with its row index and entity mask.
#[derive(Debug, Clone)]
pub struct MigrationView<'a> {
    table: &'a RawTable,
    config: &'a EngineConfig,
    index: RowIndex,
    mask: EntityMask,
}

impl<'a> MigrationView<'a> {
    /// Classify `table`. Returns `None` when it has no key column, i.e. it is
    /// not a migration table.
    pub fn prepare(table: &'a RawTable, config: &'a EngineConfig) -> Option<Self> {
        let key_column = table.column_index(&config.key_column)?;
        let index = classify(table, key_column);
        let mask = EntityMask::build(table, index.continent_row, config);

        Some(Self {
            table,
            config,
            index,
            mask,
        })
    }

    pub fn index(&self) -> &RowIndex {
        &self.index
    }

    pub fn mask(&self) -> &EntityMask {
        &self.mask
    }

    /// The full year axis: every year with at least one direction, ascending.
    pub fn years(&self) -> Vec<i32> {
        self.index.all_years()
    }

    /// Raw names of the entity columns, in table order.
    pub fn entity_columns(&self) -> Vec<&str> {
        self.mask
            .entities()
            .map(|col| self.table.headers()[col].as_str())
            .collect()
    }

    /// Raw names of the excluded columns, in table order.
    pub fn excluded_columns(&self) -> Vec<&str> {
        self.mask
            .excluded()
            .map(|col| self.table.headers()[col].as_str())
            .collect()
    }

    fn value(&self, row: usize, column: usize) -> Option<f64> {
        parse_number(self.table.cell(row, column))
    }

    fn value_or_zero(&self, row: usize, column: usize) -> f64 {
        number_or_zero(self.table.cell(row, column))
    }

    fn column_name(&self, column: usize) -> &str {
        &self.table.headers()[column]
    }

    /// Columns contributing to the yearly totals.
    fn summed_columns(&self) -> Vec<usize> {
        match self.config.totals_scope {
            TotalsScope::Entities => self.mask.entities().collect(),
            TotalsScope::AllColumns => (0..self.table.headers().len())
                .filter(|&col| !self.config.is_structural_column(self.column_name(col)))
                .collect(),
        }
    }

    fn row_sum(&self, row: Option<usize>, columns: &[usize]) -> f64 {
        row.map(|r| columns.iter().map(|&col| self.value_or_zero(r, col)).sum::<f64>())
            .unwrap_or(0.0)
    }

    /// Yearly totals over the summed columns.
    ///
    /// Each direction is summed on its own, so a year with only an arrivals
    /// row still appears (with zero departures). Empty when no year rows
    /// were found.
    pub fn total_series(&self) -> Vec<TotalPoint> {
        let columns = self.summed_columns();

        self.index
            .years
            .iter()
            .map(|(&year, rows)| {
                let arrivals = self.row_sum(rows.get(Direction::Arrivals), &columns);
                let departures = self.row_sum(rows.get(Direction::Departures), &columns);
                TotalPoint {
                    year,
                    arrivals,
                    departures,
                    balance: arrivals - departures,
                }
            })
            .collect()
    }

    /// Per-entity facts for a year with both rows present; empty otherwise.
    pub fn year_facts(&self, year: i32) -> Vec<YearFact> {
        let Some((arrivals_row, departures_row)) = self.index.rows_for(year).pair() else {
            return Vec::new();
        };

        self.mask
            .entities()
            .map(|col| YearFact {
                year,
                entity: self.column_name(col).to_string(),
                arrivals: self.value_or_zero(arrivals_row, col),
                departures: self.value_or_zero(departures_row, col),
            })
            .collect()
    }

    /// Top `n` entities by arrivals and by departures in `year`.
    ///
    /// Both sides are `None` unless the year has an arrivals and a departures
    /// row. Only strictly positive values are ranked; a side left without
    /// any is `None` on its own. Ties keep table order.
    pub fn top_by_year(&self, year: i32, n: usize) -> YearRankings {
        let (arrivals, departures) = match self.index.rows_for(year).pair() {
            Some((arrivals_row, departures_row)) => (
                self.rank_row(arrivals_row, n),
                self.rank_row(departures_row, n),
            ),
            None => (None, None),
        };

        YearRankings {
            year,
            arrivals,
            departures,
        }
    }

    fn rank_row(&self, row: usize, n: usize) -> Option<Vec<RankedEntity>> {
        let mut ranked: Vec<RankedEntity> = self
            .mask
            .entities()
            .filter_map(|col| {
                let value = self.value(row, col).filter(|v| *v > 0.0)?;
                let column = self.column_name(col);
                Some(RankedEntity {
                    column: column.to_string(),
                    name: display_name(column),
                    value,
                })
            })
            .collect();

        // stable: equal values keep column order
        ranked.sort_by(|a, b| b.value.total_cmp(&a.value));
        ranked.truncate(n);

        (!ranked.is_empty()).then_some(ranked)
    }

    /// The `k` entities with the largest absolute balance in any complete year.
    ///
    /// The "other states" / "unknown" buckets are skipped here as well as by
    /// the entity mask. Ties keep table order.
    pub fn top_by_peak_balance(&self, k: usize) -> Vec<PeakBalance> {
        let pairs: Vec<(usize, usize)> = self
            .index
            .complete_years()
            .into_iter()
            .filter_map(|year| self.index.rows_for(year).pair())
            .collect();

        let mut leaders: Vec<PeakBalance> = if pairs.is_empty() {
            Vec::new()
        } else {
            self.mask
                .entities()
                .filter(|&col| !self.config.is_bucket_column(self.column_name(col)))
                .map(|col| {
                    let peak = pairs.iter().fold(0.0_f64, |peak, &(a, d)| {
                        peak.max((self.value_or_zero(a, col) - self.value_or_zero(d, col)).abs())
                    });
                    let column = self.column_name(col);
                    PeakBalance {
                        column: column.to_string(),
                        column_index: Some(col),
                        name: display_name(column),
                        peak_abs_balance: peak,
                    }
                })
                .collect()
        };

        leaders.sort_by(|a, b| b.peak_abs_balance.total_cmp(&a.peak_abs_balance));
        leaders.truncate(k);
        leaders
    }

    /// Column of a leader: its recorded position when that still carries the
    /// leader's name, otherwise the first column of that name.
    fn leader_column(&self, leader: &PeakBalance) -> Option<usize> {
        leader
            .column_index
            .filter(|&col| self.table.headers().get(col) == Some(&leader.column))
            .or_else(|| self.table.column_index(&leader.column))
    }

    /// Balance of each `leaders` entity for every year of [`Self::years`].
    ///
    /// Years missing either row get a zero point so all series share the same
    /// year axis. Leaders whose column is not in the table are skipped.
    pub fn balance_series(&self, leaders: &[PeakBalance]) -> Vec<EntitySeries> {
        let years = self.years();

        leaders
            .iter()
            .filter_map(|leader| {
                let col = self.leader_column(leader)?;
                let points = years
                    .iter()
                    .map(|&year| {
                        let (arrivals, departures) = match self.index.rows_for(year).pair() {
                            Some((a, d)) => (self.value_or_zero(a, col), self.value_or_zero(d, col)),
                            None => (0.0, 0.0),
                        };
                        BalancePoint {
                            year,
                            arrivals,
                            departures,
                            balance: arrivals - departures,
                        }
                    })
                    .collect();

                Some(EntitySeries {
                    column: leader.column.clone(),
                    name: leader.name.clone(),
                    points,
                })
            })
            .collect()
    }
}

// =============================================================================
// Table-level entry points
// =============================================================================

/// Yearly totals of `table`; empty when it is not a migration table.
pub fn total_series(table: &RawTable, config: &EngineConfig) -> Vec<TotalPoint> {
    MigrationView::prepare(table, config)
        .map(|view| view.total_series())
        .unwrap_or_default()
}

/// Top `config.top_n` rankings for `year`; both sides `None` for non-migration tables.
pub fn top_by_year(table: &RawTable, config: &EngineConfig, year: i32) -> YearRankings {
    match MigrationView::prepare(table, config) {
        Some(view) => view.top_by_year(year, config.top_n),
        None => YearRankings {
            year,
            arrivals: None,
            departures: None,
        },
    }
}

/// Top `config.top_k` entities by peak absolute balance.
pub fn top_by_peak_balance(table: &RawTable, config: &EngineConfig) -> Vec<PeakBalance> {
    MigrationView::prepare(table, config)
        .map(|view| view.top_by_peak_balance(config.top_k))
        .unwrap_or_default()
}

/// Yearly balance series for `leaders`.
pub fn balance_series(
    table: &RawTable,
    config: &EngineConfig,
    leaders: &[PeakBalance],
) -> Vec<EntitySeries> {
    MigrationView::prepare(table, config)
        .map(|view| view.balance_series(leaders))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "herkunftsgebiet_wegzugsgebiet";

    /// Three years, 2023 without a departures row. `europa` and `italien`
    /// are tagged as continent columns, `sonstige_staaten` is a bucket.
    fn fixture() -> RawTable {
        RawTable::from_strs(
            &[KEY, "europa", "italien", "ukraine", "schweiz", "sonstige_staaten", "quelle"],
            &[
                &["Kontinent", "Europa", "Europa", "", "", "", ""],
                &["2021_ Zuzug", "900", "40", "30", "500", "77", "Statistik BW"],
                &["2021_ Wegzug", "800", "35", "20", "700", "66", "Statistik BW"],
                &["2022_ Zuzug", "950", "45", "1478", "520", "80", "Statistik BW"],
                &["2022_ Wegzug", "820", "30", "225", "799", "70", "Statistik BW"],
                &["2023_ Zuzug", "960", "50", "", "530", "81", "Statistik BW"],
            ],
        )
    }

    fn names(ranked: &[RankedEntity]) -> Vec<&str> {
        ranked.iter().map(|r| r.column.as_str()).collect()
    }

    #[test]
    fn test_not_migration_shaped() {
        let table = RawTable::from_strs(&["jahr", "einwohner"], &[&["2022", "85000"]]);
        let config = EngineConfig::default();

        assert!(MigrationView::prepare(&table, &config).is_none());
        assert!(total_series(&table, &config).is_empty());
        assert!(top_by_peak_balance(&table, &config).is_empty());
        let rankings = top_by_year(&table, &config, 2022);
        assert!(rankings.arrivals.is_none() && rankings.departures.is_none());
    }

    #[test]
    fn test_scenario_single_entity_totals() {
        let table = RawTable::from_strs(
            &[KEY, "ukraine"],
            &[&["2022_ Zuzug", "1478"], &["2022_ Wegzug", "225"]],
        );
        let totals = total_series(&table, &EngineConfig::default());

        assert_eq!(
            totals,
            vec![TotalPoint {
                year: 2022,
                arrivals: 1478.0,
                departures: 225.0,
                balance: 1253.0,
            }]
        );
    }

    #[test]
    fn test_total_series_sums_entities_per_side() {
        let totals = total_series(&fixture(), &EngineConfig::default());

        let years: Vec<i32> = totals.iter().map(|p| p.year).collect();
        assert_eq!(years, vec![2021, 2022, 2023]);

        assert_eq!((totals[0].arrivals, totals[0].departures), (530.0, 720.0));
        assert_eq!((totals[1].arrivals, totals[1].departures), (1998.0, 1024.0));
        // empty ukraine cell counts as zero, missing departures row as zero
        assert_eq!((totals[2].arrivals, totals[2].departures), (530.0, 0.0));

        for point in &totals {
            assert_eq!(point.balance, point.arrivals - point.departures);
        }
    }

    #[test]
    fn test_total_series_all_columns_scope() {
        let config = EngineConfig::default().with_totals_scope(TotalsScope::AllColumns);
        let totals = total_series(&fixture(), &config);

        // source column text is not numeric and the key column is never summed
        assert_eq!(totals[0].arrivals, 900.0 + 40.0 + 30.0 + 500.0 + 77.0);
        assert_eq!(totals[0].departures, 800.0 + 35.0 + 20.0 + 700.0 + 66.0);
    }

    #[test]
    fn test_no_year_rows() {
        let table = RawTable::from_strs(&[KEY, "ukraine"], &[&["Kontinent", "Europa"]]);
        let view_config = EngineConfig::default();
        let view = MigrationView::prepare(&table, &view_config).unwrap();

        assert!(view.total_series().is_empty());
        assert!(view.years().is_empty());
        assert!(view.top_by_peak_balance(5).is_empty());
    }

    #[test]
    fn test_top_by_year() {
        let config = EngineConfig::default();
        let rankings = top_by_year(&fixture(), &config, 2022);

        let arrivals = rankings.arrivals.unwrap();
        assert_eq!(names(&arrivals), vec!["ukraine", "schweiz"]);
        assert_eq!(arrivals[0].name, "Ukraine");
        assert_eq!(arrivals[0].value, 1478.0);

        let departures = rankings.departures.unwrap();
        assert_eq!(names(&departures), vec!["schweiz", "ukraine"]);
    }

    #[test]
    fn test_continent_columns_never_ranked() {
        let config = EngineConfig::default();
        let table = fixture();
        let view = MigrationView::prepare(&table, &config).unwrap();

        for year in view.years() {
            let rankings = view.top_by_year(year, 10);
            for side in [rankings.arrivals, rankings.departures].into_iter().flatten() {
                for entry in side {
                    assert!(!["italien", "europa", "sonstige_staaten", "quelle", KEY]
                        .contains(&entry.column.as_str()));
                }
            }
        }
        assert!(view.top_by_peak_balance(10).iter().all(|p| p.column != "italien"));
        assert_eq!(view.entity_columns(), vec!["ukraine", "schweiz"]);
    }

    #[test]
    fn test_year_without_arrivals_row_has_no_data() {
        let config = EngineConfig::default();

        // 2023 has no departures row, 2030 has nothing at all
        for year in [2023, 2030] {
            let rankings = top_by_year(&fixture(), &config, year);
            assert_eq!(rankings.year, year);
            assert!(rankings.arrivals.is_none());
            assert!(rankings.departures.is_none());
        }
    }

    #[test]
    fn test_sides_without_positive_values_are_independent() {
        let table = RawTable::from_strs(
            &[KEY, "ukraine", "polen"],
            &[&["2020_ Zuzug", "5", "0"], &["2020_ Wegzug", "0", ""]],
        );
        let rankings = top_by_year(&table, &EngineConfig::default(), 2020);

        assert_eq!(names(&rankings.arrivals.unwrap()), vec!["ukraine"]);
        assert!(rankings.departures.is_none());
    }

    #[test]
    fn test_rankings_sorted_truncated_and_stable() {
        let headers = [KEY, "a", "b", "c", "d", "e"];
        let table = RawTable::from_strs(
            &headers,
            &[
                &["2020_ Zuzug", "10", "30", "10", "-4", "20"],
                &["2020_ Wegzug", "1", "1", "1", "1", "1"],
            ],
        );
        let view_config = EngineConfig::default();
        let view = MigrationView::prepare(&table, &view_config).unwrap();
        let arrivals = view.top_by_year(2020, 3).arrivals.unwrap();

        assert_eq!(names(&arrivals), vec!["b", "e", "a"]);
        assert!(arrivals.windows(2).all(|w| w[0].value >= w[1].value));
        assert!(arrivals.iter().all(|r| r.value > 0.0));

        let all = view.top_by_year(2020, 10).arrivals.unwrap();
        // tie between a and c keeps column order, negative d dropped
        assert_eq!(names(&all), vec!["b", "e", "a", "c"]);
    }

    #[test]
    fn test_peak_balance_ranking() {
        let config = EngineConfig::default();
        let leaders = top_by_peak_balance(&fixture(), &config);

        let columns: Vec<&str> = leaders.iter().map(|l| l.column.as_str()).collect();
        assert_eq!(columns, vec!["ukraine", "schweiz"]);
        assert_eq!(leaders[0].peak_abs_balance, 1253.0);
        assert_eq!(leaders[1].peak_abs_balance, 279.0);
    }

    #[test]
    fn test_larger_peak_ranks_first() {
        let table = RawTable::from_strs(
            &[KEY, "schweiz", "ukraine"],
            &[
                &["2021_ Zuzug", "100", "30"],
                &["2021_ Wegzug", "900", "20"],
                &["2022_ Zuzug", "", "1478"],
                &["2022_ Wegzug", "", "225"],
            ],
        );
        let leaders = top_by_peak_balance(&table, &EngineConfig::default().with_top_k(5));

        assert_eq!(leaders[0].column, "ukraine");
        assert_eq!(leaders[0].peak_abs_balance, 1253.0);
        assert_eq!(leaders[1].column, "schweiz");
        assert_eq!(leaders[1].peak_abs_balance, 800.0);
    }

    #[test]
    fn test_peak_balance_top_k_limit() {
        let config = EngineConfig::default();
        let table = fixture();
        let view = MigrationView::prepare(&table, &config).unwrap();
        assert_eq!(view.top_by_peak_balance(1).len(), 1);
        assert!(view.top_by_peak_balance(0).is_empty());
    }

    #[test]
    fn test_balance_series_zero_fills_incomplete_years() {
        let config = EngineConfig::default();
        let table = fixture();
        let leaders = top_by_peak_balance(&table, &config);
        let series = balance_series(&table, &config, &leaders);

        assert_eq!(series.len(), 2);
        for entity in &series {
            let years: Vec<i32> = entity.points.iter().map(|p| p.year).collect();
            assert_eq!(years, vec![2021, 2022, 2023]);
        }

        let ukraine = &series[0];
        assert_eq!(ukraine.name, "Ukraine");
        assert_eq!(ukraine.points[1].balance, 1253.0);
        assert_eq!(ukraine.points[2].arrivals, 0.0);
        assert_eq!(ukraine.points[2].balance, 0.0);

        // schweiz has 530 arrivals in 2023 but no departures row: zero-filled
        let schweiz = &series[1];
        assert_eq!(schweiz.points[0].balance, -200.0);
        assert_eq!(schweiz.points[2].arrivals, 0.0);
    }

    #[test]
    fn test_balance_series_skips_unknown_columns() {
        let config = EngineConfig::default();
        let leaders = vec![PeakBalance {
            column: "atlantis".into(),
            column_index: Some(1),
            name: "Atlantis".into(),
            peak_abs_balance: 1.0,
        }];
        assert!(balance_series(&fixture(), &config, &leaders).is_empty());
    }

    #[test]
    fn test_repeated_column_names_keep_their_own_values() {
        let config = EngineConfig::default();
        let table = RawTable::from_strs(
            &[KEY, "x", "x"],
            &[&["2021_ Zuzug", "10", "900"], &["2021_ Wegzug", "0", "0"]],
        );
        let view = MigrationView::prepare(&table, &config).unwrap();

        let leaders = view.top_by_peak_balance(1);
        assert_eq!(leaders[0].column_index, Some(2));
        assert_eq!(leaders[0].peak_abs_balance, 900.0);

        let series = view.balance_series(&leaders);
        assert_eq!(series[0].points[0].balance, 900.0);
    }

    #[test]
    fn test_year_facts() {
        let config = EngineConfig::default();
        let table = fixture();
        let view = MigrationView::prepare(&table, &config).unwrap();

        let facts = view.year_facts(2022);
        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0].entity, "ukraine");
        assert_eq!(facts[0].balance(), 1253.0);
        assert!(view.year_facts(2023).is_empty());
    }

    #[test]
    fn test_operations_are_idempotent() {
        let config = EngineConfig::default();
        let table = fixture();

        assert_eq!(total_series(&table, &config), total_series(&table, &config));
        assert_eq!(top_by_year(&table, &config, 2022), top_by_year(&table, &config, 2022));
        let first = top_by_peak_balance(&table, &config);
        assert_eq!(first, top_by_peak_balance(&table, &config));
        assert_eq!(
            balance_series(&table, &config, &first),
            balance_series(&table, &config, &first)
        );
    }
}
