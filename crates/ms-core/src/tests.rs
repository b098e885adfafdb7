//! Unit tests for ms-core primitives.

#[cfg(test)]
mod ids {
    use crate::{AtomId, ElementId};

    #[test]
    fn index_roundtrip() {
        let id = ElementId(42);
        assert_eq!(id.index(), 42);
        assert_eq!(ElementId::try_from(42usize).unwrap(), id);
    }

    #[test]
    fn from_index_and_try_from_agree() {
        assert_eq!(AtomId::from_index(3), AtomId::try_from(3usize).unwrap());
        assert!(ElementId::try_from(u32::MAX as usize + 1).is_err());
    }

    #[test]
    fn display() {
        assert_eq!(ElementId(7).to_string(), "ElementId(7)");
    }
}

#[cfg(test)]
mod time {
    use crate::{SimClock, Step};

    #[test]
    fn step_arithmetic() {
        let s = Step(-3);
        assert_eq!(s + 5, Step(2));
        assert_eq!(s.next(), Step(-2));
        assert_eq!(Step(10) - Step(4), 6);
        assert_eq!(Step(4).since(Step(10)), -6);
    }

    #[test]
    fn multiples_ignore_non_positive_intervals() {
        assert!(Step(20).is_multiple_of(10));
        assert!(!Step(21).is_multiple_of(10));
        assert!(Step(-10).is_multiple_of(5));
        assert!(!Step(0).is_multiple_of(0));
        assert!(!Step(0).is_multiple_of(-1));
    }

    #[test]
    fn clock_derives_time_from_step() {
        let clock = SimClock::new(1.5, 0.5);
        assert_eq!(clock.time_at(Step(0)), 1.5);
        assert_eq!(clock.time_at(Step(4)), 3.5);
        assert_eq!(clock.time_at(Step(-1)), 1.0);
    }

    #[test]
    fn max_step_displays_as_infinite() {
        assert_eq!(Step::MAX.to_string(), "inf");
        assert_eq!(Step(12).to_string(), "12");
    }
}

#[cfg(test)]
mod config {
    use crate::{CoreError, RunConfig, Step};

    #[test]
    fn default_validates() {
        RunConfig::default().validate().unwrap();
    }

    #[test]
    fn last_step_is_inclusive() {
        let cfg = RunConfig { init_step: 10, nsteps: 5, ..RunConfig::default() };
        assert_eq!(cfg.init_step(), Step(10));
        assert_eq!(cfg.last_step(), Step(15));
    }

    #[test]
    fn infinite_run_has_no_last_step() {
        let cfg = RunConfig { nsteps: -1, ..RunConfig::default() };
        assert_eq!(cfg.last_step(), Step::MAX);
        cfg.validate().unwrap();
    }

    #[test]
    fn rejects_nsteps_below_minus_one() {
        let cfg = RunConfig { nsteps: -2, ..RunConfig::default() };
        assert!(matches!(cfg.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn rejects_negative_interval() {
        let cfg = RunConfig { nstenergy: -5, ..RunConfig::default() };
        match cfg.validate() {
            Err(CoreError::NegativeInterval { name, value }) => {
                assert_eq!(name, "nstenergy");
                assert_eq!(value, -5);
            }
            other => panic!("expected NegativeInterval, got {other:?}"),
        }
    }

    #[test]
    fn rejects_non_finite_delta_t() {
        let cfg = RunConfig { delta_t: f64::NAN, ..RunConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_max_hours() {
        let cfg = RunConfig { max_hours: Some(0.0), ..RunConfig::default() };
        assert!(cfg.validate().is_err());
    }
}

#[cfg(test)]
mod rng {
    use crate::{AtomId, AtomRng};

    #[test]
    fn same_seed_same_stream() {
        let mut a = AtomRng::new(42, AtomId(3));
        let mut b = AtomRng::new(42, AtomId(3));
        for _ in 0..10 {
            assert_eq!(a.gaussian(), b.gaussian());
        }
    }

    #[test]
    fn gaussian_is_finite() {
        let mut r = AtomRng::new(7, AtomId(0));
        for _ in 0..1000 {
            assert!(r.gaussian().is_finite());
        }
    }
}
