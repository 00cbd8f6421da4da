use std::fmt;
use std::path::Path;
use fnv::{FnvHashMap, FnvHashSet};

pub mod data;
pub mod espprc;
pub mod lp;
pub mod master;
pub mod orchestrator;

pub type Map<K, V> = FnvHashMap<K, V>;
pub type Set<T> = FnvHashSet<T>;

/// Solver-core errors. Budget exhaustion (iterations, wall clock) is a
/// status, not an error -- see [`orchestrator::CgStatus`].
#[derive(Debug, Clone)]
pub enum Error {
    /// A registered resource breaks the catalog contract (window arrays of
    /// the wrong size, reversed bounds, missing `cost` resource, ...).
    /// Always a modeling bug.
    ResourceMisdeclared(String),
    /// The restricted master LP is infeasible even after seeding.
    InfeasibleMaster,
    /// The LP backend reported an error or a non-optimal status where an
    /// optimum was required.
    BackendFailure(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl std::error::Error for Error {}

mod logging_setup {
    use super::*;
    use tracing_subscriber::{EnvFilter, fmt, registry, prelude::*};
    use tracing_appender::{non_blocking, non_blocking::WorkerGuard};
    use std::fs::OpenOptions;

    fn build_and_set_global_subscriber<P>(logfile: Option<P>, is_test: bool) -> Option<WorkerGuard> where
        P: AsRef<Path>
    {
        let stderr_log = fmt::layer();
        let env_filter = EnvFilter::from_default_env();
        let r = registry().with(stderr_log).with(env_filter);

        let flush_guard = match logfile {
            Some(p) => {
                let logfile = OpenOptions::new()
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(p).unwrap();
                let (writer, _guard) = non_blocking::NonBlockingBuilder::default()
                    .lossy(false)
                    .finish(logfile);
                let json = fmt::layer()
                    .json()
                    .with_span_list(true)
                    .with_current_span(false)
                    .with_writer(writer);

                let r = r.with(json);
                if is_test { r.try_init().ok(); }
                else { r.init(); }
                Some(_guard)
            },
            None => {
                if is_test { r.try_init().ok(); }
                else { r.init(); }
                None
            }
        };
        return flush_guard
    }

    pub fn init_logging(logfile: Option<impl AsRef<Path>>) -> Option<WorkerGuard> {
        return build_and_set_global_subscriber(logfile, false);
    }

    #[allow(dead_code)]
    pub fn init_test_logging(logfile: Option<impl AsRef<Path>>) -> Option<WorkerGuard> {
        return build_and_set_global_subscriber(logfile, true);
    }
}
pub use logging_setup::*;


pub(crate) mod utils {
    /// Iterator over the indices of the set bits of a word, ascending.
    pub struct Biterator {
        bits: u64,
    }

    impl Biterator {
        pub fn new(val: u64) -> Self {
            Self { bits: val }
        }
    }

    impl Iterator for Biterator {
        type Item = u32;

        fn next(&mut self) -> Option<u32> {
            if self.bits == 0 {
                return None;
            }
            let i = self.bits.trailing_zeros();
            self.bits &= self.bits - 1;
            return Some(i);
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn biterate() {
            fn get_inds(val: u64) -> Vec<u32> {
                return Biterator::new(val).collect();
            }

            assert_eq!(get_inds(0), Vec::<u32>::new());
            assert_eq!(get_inds(1), vec![0u32]);
            assert_eq!(get_inds(0b010101010101), vec![0, 2, 4, 6, 8, 10]);
            assert_eq!(get_inds(0b01110010011), vec![0, 1, 4, 7, 8, 9]);
            assert_eq!(get_inds(u64::MAX), (0..64).collect::<Vec<_>>());
        }
    }
}
