//! Statistics Accumulator

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::OnceLock;

/// Return the global statistics accumulator.
pub fn stats_accumulator() -> &'static Mutex<StatsAccumulator> {
    static DATA: OnceLock<Mutex<StatsAccumulator>> = OnceLock::new();
    DATA.get_or_init(|| Mutex::new(StatsAccumulator::default()))
}

/// Aggregate build statistics. Names use `/` to separate a category from a
/// title, e.g. "BVH/Interior nodes".
#[derive(Default)]
pub struct StatsAccumulator {
    /// Counters.
    counters: BTreeMap<String, i64>,

    /// Memory counters in bytes.
    memory_counters: BTreeMap<String, u64>,

    /// Ratios.
    ratios: BTreeMap<String, (i64, i64)>,
}

impl StatsAccumulator {
    /// Accumulates a counter value.
    ///
    /// * `name` - Statistic name.
    /// * `val`  - Counter value.
    pub fn report_counter(&mut self, name: &str, val: i64) {
        *self.counters.entry(name.to_string()).or_insert(0) += val;
    }

    /// Accumulates a memory counter value.
    ///
    /// * `name` - Statistic name.
    /// * `val`  - Memory counter value.
    pub fn report_memory_counter(&mut self, name: &str, val: u64) {
        *self.memory_counters.entry(name.to_string()).or_insert(0) += val;
    }

    /// Accumulates a ratio value.
    ///
    /// * `name`  - Statistic name.
    /// * `num`   - Numerator.
    /// * `denom` - Denominator.
    pub fn report_ratio(&mut self, name: &str, num: i64, denom: i64) {
        let v = self.ratios.entry(name.to_string()).or_insert((0, 0));
        v.0 += num;
        v.1 += denom;
    }

    /// Returns an accumulated counter.
    ///
    /// * `name` - Statistic name.
    pub fn counter(&self, name: &str) -> Option<i64> {
        self.counters.get(name).copied()
    }

    /// Returns an accumulated memory counter.
    ///
    /// * `name` - Statistic name.
    pub fn memory_counter(&self, name: &str) -> Option<u64> {
        self.memory_counters.get(name).copied()
    }

    /// Formats the report grouped by category.
    pub fn report(&self) -> String {
        let mut to_print: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for (k, v) in self.counters.iter().filter(|(_, v)| **v != 0) {
            let (category, title) = get_category_and_title(k);
            to_print
                .entry(category)
                .or_default()
                .push(format!("{title:<42}               {v:12}"));
        }

        for (k, v) in self.memory_counters.iter().filter(|(_, v)| **v != 0) {
            let (category, title) = get_category_and_title(k);
            let kb = *v as f64 / 1024.0;
            let s = if kb < 1024.0 {
                format!("{title:<42}                  {kb:9.2} kB")
            } else {
                format!("{title:<42}                  {:9.2} MiB", kb / 1024.0)
            };
            to_print.entry(category).or_default().push(s);
        }

        for (k, &(num, denom)) in self.ratios.iter().filter(|(_, (_, d))| *d != 0) {
            let (category, title) = get_category_and_title(k);
            to_print.entry(category).or_default().push(format!(
                "{title:<42}{num:12} / {denom:12} ({:.2}x)",
                num as f64 / denom as f64
            ));
        }

        let mut out = String::from("Statistics:\n");
        for (category, items) in to_print {
            out.push_str(&format!("  {category}\n"));
            for item in items {
                out.push_str(&format!("    {item}\n"));
            }
        }
        out
    }

    /// Prints the report.
    pub fn print(&self) {
        print!("{}", self.report());
    }

    /// Clear the accumulated statistics.
    pub fn clear(&mut self) {
        self.counters.clear();
        self.memory_counters.clear();
        self.ratios.clear();
    }
}

/// Splits a statistic name at the first `/` as the separator and returns category and title. If there is no `/`, then
/// category is the empty string.
///
/// * `s` - The statistic name to split.
fn get_category_and_title(s: &str) -> (String, String) {
    match s.split_once('/') {
        Some((category, title)) => (category.to_string(), title.to_string()),
        None => (String::new(), s.to_string()),
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_and_groups() {
        let mut accum = StatsAccumulator::default();
        accum.report_counter("BVH/Leaf nodes", 3);
        accum.report_counter("BVH/Leaf nodes", 4);
        accum.report_memory_counter("BVH/Tree bytes", 2048);
        accum.report_ratio("Light tree/Lights per leaf", 10, 5);

        assert_eq!(accum.counter("BVH/Leaf nodes"), Some(7));
        assert_eq!(accum.memory_counter("BVH/Tree bytes"), Some(2048));

        let report = accum.report();
        assert!(report.contains("  BVH\n"));
        assert!(report.contains("Leaf nodes"));
        assert!(report.contains("2.00 kB"));
        assert!(report.contains("(2.00x)"));

        accum.clear();
        assert_eq!(accum.counter("BVH/Leaf nodes"), None);
    }

    #[test]
    fn category_split() {
        assert_eq!(
            get_category_and_title("BVH/Interior nodes"),
            ("BVH".to_string(), "Interior nodes".to_string())
        );
        assert_eq!(get_category_and_title("plain"), (String::new(), "plain".to_string()));
    }
}
