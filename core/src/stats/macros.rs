//! Macros
//!
//! The generated functions refer to `StatsAccumulator`, `stats_registrar` and
//! `stats_accumulator` unqualified, so callers import `lsis_core::stats::*`.

/// Create a thread local variable to track an `i64` counter across threads.
///
/// * `$title`     - Descriptive title of the statistic that uses `/` as a separator for categories.
///                  For example: "BVH/Interior nodes",
/// * `$var`       - An identifier for the thread local variable.
/// * `stats_func` - An identifier for the callback function used by `StatsRegistrar::call_stat_funcs()` to report to
///                  `StatsAccumulator`.
#[macro_export]
macro_rules! stat_counter {
    ($title: expr, $var: ident, $stats_func: ident $(,)?) => {
        thread_local! { pub(crate) static $var: std::cell::RefCell<i64> = std::cell::RefCell::new(0); }

        pub(crate) fn $stats_func(accum: &mut StatsAccumulator) {
            let val = $var.with(|v| v.replace(0));
            accum.report_counter($title, val);
        }
    };
}

/// Create a thread local variable to track memory usage as a counter across threads.
///
/// * `$title`     - Descriptive title of the statistic that uses `/` as a separator for categories.
/// * `$var`       - An identifier for the thread local variable.
/// * `stats_func` - An identifier for the callback function used by `StatsRegistrar::call_stat_funcs()` to report to
///                  `StatsAccumulator`.
#[macro_export]
macro_rules! stat_memory_counter {
    ($title: expr, $var: ident, $stats_func: ident $(,)?) => {
        thread_local! { pub(crate) static $var: std::cell::RefCell<u64> = std::cell::RefCell::new(0); }

        pub(crate) fn $stats_func(accum: &mut StatsAccumulator) {
            let val = $var.with(|v| v.replace(0));
            accum.report_memory_counter($title, val);
        }
    };
}

/// Create thread local variables to track an `i64` values for numerator/denominator as ratio across threads.
///
/// * `$title`     - Descriptive title of the statistic that uses `/` as a separator for categories.
/// * `$var_num`   - An identifier for the thread local variable for numerator.
/// * `$var_denom` - An identifier for the thread local variable for denominator.
/// * `stats_func` - An identifier for the callback function used by `StatsRegistrar::call_stat_funcs()` to report to
///                  `StatsAccumulator`.
#[macro_export]
macro_rules! stat_ratio {
    ($title: expr, $var_num: ident, $var_denom: ident, $stats_func: ident $(,)?) => {
        thread_local! {
            pub(crate) static $var_num: std::cell::RefCell<i64> = std::cell::RefCell::new(0);
            pub(crate) static $var_denom: std::cell::RefCell<i64> = std::cell::RefCell::new(0);
        }

        pub(crate) fn $stats_func(accum: &mut StatsAccumulator) {
            let num = $var_num.with(|v| v.replace(0));
            let denom = $var_denom.with(|v| v.replace(0));
            accum.report_ratio($title, num, denom);
        }
    };
}

/// Convenience macro to increment a thread local counter.
#[macro_export]
macro_rules! stat_inc {
    ($var: ident, $e: expr) => {
        $var.with(|v| *v.borrow_mut() += $e);
    };
}

/// Convenience macro to register the callback functions for statistics.
///
/// * `$($func: ident),+` - One or more callback functions created by the `stat_*` macros.
#[macro_export]
macro_rules! stat_register_fns {
    ($($stat_func: ident),+ $(,)?) => {
        /// Register this module's statistics once. Call it from the builder
        /// entry points, not from per-primitive code.
        pub(crate) fn register_stats() {
            static REGISTERED: std::sync::Once = std::sync::Once::new();
            REGISTERED.call_once(|| {
                if let Ok(mut sr) = stats_registrar().lock() {
                    $(
                        sr.register_stat_func($stat_func);
                    )+
                }
            });
        }
    };
}

/// Accumulate thread local statistics in the global `StatsAccumulator` by
/// calling the registered callbacks. Call it on the thread that ran the
/// builds.
#[macro_export]
macro_rules! report_stats {
    () => {{
        if let (Ok(mut accum), Ok(sr)) = (stats_accumulator().lock(), stats_registrar().lock()) {
            sr.call_stat_funcs(&mut accum);
        }
    }};
}

/// Print accumulated statistics in the global `StatsAccumulator`.
#[macro_export]
macro_rules! print_stats {
    () => {{
        if let Ok(accum) = stats_accumulator().lock() {
            accum.print();
        }
    }};
}
