use crate::error::CoreResult;
use crate::storage::{format_save_date, parse_save_date, PetRecord, PetStore};
use chrono::NaiveDateTime;
use rand::Rng;
use std::time::Instant;

pub(crate) const MAX_STAT: f64 = 50.0;
pub(crate) const FATIGUE_PER_HOUR: f64 = 0.1;
pub(crate) const SLEEP_PER_HOUR: f64 = 0.15;
pub(crate) const EXP_DECAY_PER_HOUR: f64 = 0.002;
pub(crate) const HEALTH_DECAY_PER_HOUR: f64 = 0.01;
pub(crate) const HEALTH_DECAY_THRESHOLD: f64 = 0.8;
pub(crate) const HEALTH_FLOOR: f64 = 0.1;
pub(crate) const REST_FATIGUE_PER_SEC: f64 = 0.1;
pub(crate) const REST_SLEEP_PER_SEC: f64 = 0.2;

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Pet {
    pub(crate) name: String,
    pub(crate) health: f64,
    pub(crate) fatigue: f64,
    pub(crate) sleepiness: f64,
    pub(crate) experience: f64,
    pub(crate) resting: bool,
    pub(crate) rest_started: Option<Instant>,
    pub(crate) alive: bool,
}

impl Pet {
    /// A newborn with a little random variation.
    pub(crate) fn fresh(name: &str, rng: &mut impl Rng) -> Self {
        Self {
            name: name.to_string(),
            health: rng.gen_range(5..=15) as f64,
            fatigue: rng.gen_range(0..=5) as f64,
            sleepiness: rng.gen_range(0..=5) as f64,
            experience: 0.0,
            resting: false,
            rest_started: None,
            alive: true,
        }
    }

    /// Restores `name` from `store` and ages it by the time since its last
    /// save. Unknown pets are created and saved right away; unreadable
    /// records are logged and replaced.
    pub(crate) fn load(
        name: &str,
        store: &PetStore,
        now: NaiveDateTime,
        rng: &mut impl Rng,
    ) -> Self {
        let record = match store.load_record(name) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("could not load '{name}', starting fresh: {e}");
                None
            }
        };

        let Some(record) = record else {
            let pet = Self::fresh(name, rng);
            if let Err(e) = pet.save(store, now) {
                tracing::warn!("could not save new pet '{name}': {e}");
            }
            tracing::info!("hatched '{name}'");
            return pet;
        };

        let mut pet = Self {
            name: name.to_string(),
            health: record.health,
            fatigue: record.fatigue,
            sleepiness: record.sleep,
            experience: record.experience,
            resting: false,
            rest_started: None,
            alive: true,
        };
        match record.save_date.as_deref().and_then(parse_save_date) {
            Some(saved_at) => {
                let hours = (now - saved_at).num_milliseconds() as f64 / 3_600_000.0;
                pet.apply_time_degradation(hours.max(0.0));
            }
            None => tracing::warn!(
                "save date of '{name}' missing or unreadable ({:?}), skipping offline aging",
                record.save_date
            ),
        }
        tracing::info!(
            "loaded '{name}': health={:.1} fatigue={:.1} sleep={:.1}",
            pet.health,
            pet.fatigue,
            pet.sleepiness
        );
        pet
    }

    pub(crate) fn record(&self, now: NaiveDateTime) -> PetRecord {
        PetRecord {
            health: self.health,
            fatigue: self.fatigue,
            sleep: self.sleepiness,
            experience: self.experience,
            resting: self.resting,
            save_date: Some(format_save_date(now)),
        }
    }

    pub(crate) fn save(&self, store: &PetStore, now: NaiveDateTime) -> CoreResult<()> {
        store.save_record(&self.name, &self.record(now))
    }

    pub(crate) fn is_dead(&self) -> bool {
        self.fatigue > MAX_STAT || self.sleepiness > MAX_STAT || self.health == 0.0
    }

    pub(crate) fn rest_at(&mut self, now: Instant) {
        if !self.resting {
            self.resting = true;
            self.rest_started = Some(now);
        }
    }

    pub(crate) fn awake(&mut self) {
        self.resting = false;
        self.rest_started = None;
    }

    /// Recovers fatigue and sleepiness for the time spent resting since the
    /// last tick. Wakes up once both are back to zero.
    pub(crate) fn tick_at(&mut self, now: Instant) {
        if !self.resting {
            return;
        }
        let Some(started) = self.rest_started else {
            self.rest_started = Some(now);
            return;
        };
        let secs = now.saturating_duration_since(started).as_secs_f64();
        self.sleepiness = round3(self.sleepiness - REST_SLEEP_PER_SEC * secs).max(0.0);
        self.fatigue = round3(self.fatigue - REST_FATIGUE_PER_SEC * secs).max(0.0);
        self.rest_started = Some(now);
        if self.sleepiness == 0.0 && self.fatigue == 0.0 {
            self.resting = false;
        }
    }

    /// Ages the pet by `hours` of neglect.
    pub(crate) fn apply_time_degradation(&mut self, hours: f64) {
        let fatigue_up = (hours * FATIGUE_PER_HOUR).min(MAX_STAT - self.fatigue);
        self.fatigue += fatigue_up;

        let exp_decay = self.experience * hours * EXP_DECAY_PER_HOUR;
        self.experience = (self.experience - exp_decay).max(0.0);

        let sleep_up = (hours * SLEEP_PER_HOUR).min(MAX_STAT - self.sleepiness);
        self.sleepiness += sleep_up;

        if self.fatigue > HEALTH_DECAY_THRESHOLD || self.sleepiness > HEALTH_DECAY_THRESHOLD {
            self.health = (self.health - hours * HEALTH_DECAY_PER_HOUR).max(HEALTH_FLOOR);
        }
        tracing::debug!(
            "aged {hours:.2}h: +{fatigue_up:.2} fatigue, -{exp_decay:.2} xp, +{sleep_up:.2} sleep"
        );
    }
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, NaiveDate};
    use parking_lot::Mutex;
    use rand::{rngs::StdRng, SeedableRng};
    use std::fs;
    use std::io;
    use std::sync::Arc;
    use std::time::Duration;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn pet(health: f64, fatigue: f64, sleepiness: f64, experience: f64) -> Pet {
        Pet {
            name: "Rex".into(),
            health,
            fatigue,
            sleepiness,
            experience,
            resting: false,
            rest_started: None,
            alive: true,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn zero_hours_changes_nothing() {
        let mut p = pet(10.0, 3.0, 4.0, 20.0);
        p.apply_time_degradation(0.0);
        assert_eq!(p, pet(10.0, 3.0, 4.0, 20.0));
    }

    #[test]
    fn degradation_is_additive_below_the_caps() {
        let mut once = pet(10.0, 3.0, 4.0, 0.0);
        once.apply_time_degradation(5.0);
        let mut twice = pet(10.0, 3.0, 4.0, 0.0);
        twice.apply_time_degradation(2.0);
        twice.apply_time_degradation(3.0);
        assert!(close(once.fatigue, twice.fatigue));
        assert!(close(once.sleepiness, twice.sleepiness));
        assert!(close(once.health, twice.health));
        assert!(close(once.fatigue, 3.5));
        assert!(close(once.sleepiness, 4.75));
        assert!(close(once.health, 9.95));
    }

    #[test]
    fn stats_cap_and_health_floors() {
        let mut p = pet(1.0, 49.0, 10.0, 100.0);
        p.apply_time_degradation(1000.0);
        assert!(close(p.fatigue, MAX_STAT));
        assert!(close(p.sleepiness, MAX_STAT));
        assert!(close(p.health, HEALTH_FLOOR));
        assert_eq!(p.experience, 0.0);
        assert!(!p.is_dead());
    }

    #[test]
    fn rested_pet_keeps_its_health() {
        let mut p = pet(10.0, 0.0, 0.0, 0.0);
        p.apply_time_degradation(2.0);
        assert!(close(p.health, 10.0));
    }

    #[test]
    fn death_predicate() {
        assert!(!pet(1.0, MAX_STAT, MAX_STAT, 0.0).is_dead());
        assert!(pet(1.0, MAX_STAT + 0.1, 0.0, 0.0).is_dead());
        assert!(pet(1.0, 0.0, MAX_STAT + 0.1, 0.0).is_dead());
        assert!(pet(0.0, 0.0, 0.0, 0.0).is_dead());
    }

    #[test]
    fn new_pet_is_saved_immediately() {
        let tmp = tempfile::tempdir().unwrap();
        let store = PetStore::new(tmp.path());
        let mut rng = StdRng::seed_from_u64(3);
        let p = Pet::load("Rex", &store, noon(), &mut rng);

        assert!((5.0..=15.0).contains(&p.health));
        assert!((0.0..=5.0).contains(&p.fatigue));
        assert!((0.0..=5.0).contains(&p.sleepiness));
        assert_eq!(p.experience, 0.0);
        assert!(p.alive && !p.resting);

        let rec = store.load_record("Rex").unwrap().unwrap();
        assert_eq!(rec.health, p.health);
        assert_eq!(rec.save_date.as_deref(), Some("05/01/2024, 12:00:00"));
    }

    #[test]
    fn loaded_pet_ages_by_time_since_save() {
        let tmp = tempfile::tempdir().unwrap();
        let store = PetStore::new(tmp.path());
        pet(10.0, 1.0, 2.0, 50.0).save(&store, noon()).unwrap();

        let later = noon() + ChronoDuration::hours(10);
        let p = Pet::load("Rex", &store, later, &mut StdRng::seed_from_u64(0));
        assert!(close(p.fatigue, 2.0));
        assert!(close(p.sleepiness, 3.5));
        assert!(close(p.experience, 49.0));
        assert!(close(p.health, 9.9));
    }

    #[test]
    fn save_from_the_future_is_not_negative_time() {
        let tmp = tempfile::tempdir().unwrap();
        let store = PetStore::new(tmp.path());
        pet(10.0, 1.0, 2.0, 50.0).save(&store, noon()).unwrap();
        let earlier = noon() - ChronoDuration::hours(3);
        let p = Pet::load("Rex", &store, earlier, &mut StdRng::seed_from_u64(0));
        assert_eq!(p.fatigue, 1.0);
        assert_eq!(p.health, 10.0);
    }

    #[test]
    fn corrupt_save_starts_fresh() {
        let tmp = tempfile::tempdir().unwrap();
        let store = PetStore::new(tmp.path());
        fs::write(store.path_for("Rex"), "not json at all").unwrap();
        let p = Pet::load("Rex", &store, noon(), &mut StdRng::seed_from_u64(1));
        assert!((5.0..=15.0).contains(&p.health));
        assert!(store.load_record("Rex").unwrap().is_some());
    }

    #[derive(Clone, Default)]
    struct LogBuf(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn undated_save_loads_unaged_with_a_warning() {
        let tmp = tempfile::tempdir().unwrap();
        let store = PetStore::new(tmp.path());
        fs::write(
            store.path_for("Rex"),
            r#"{"Rex": {"properties": {"health": 8, "fatigue": 2, "sleep": 3}}}"#,
        )
        .unwrap();

        let logs = LogBuf::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let later = noon() + ChronoDuration::hours(100);
        let p = tracing::subscriber::with_default(subscriber, || {
            Pet::load("Rex", &store, later, &mut StdRng::seed_from_u64(0))
        });

        assert_eq!((p.health, p.fatigue, p.sleepiness), (8.0, 2.0, 3.0));
        let out = String::from_utf8(logs.0.lock().clone()).unwrap();
        assert!(out.contains("WARN"));
        assert!(out.contains("skipping offline aging"));
    }

    #[test]
    fn resting_recovers_per_second_and_wakes_at_zero() {
        let mut p = pet(10.0, 1.0, 3.0, 0.0);
        let t0 = Instant::now();
        p.rest_at(t0);
        p.rest_at(t0 + Duration::from_secs(5));
        assert_eq!(p.rest_started, Some(t0));

        p.tick_at(t0 + Duration::from_secs(5));
        assert!(close(p.sleepiness, 2.0));
        assert!(close(p.fatigue, 0.5));
        assert!(p.resting);

        p.tick_at(t0 + Duration::from_secs(20));
        assert_eq!(p.sleepiness, 0.0);
        assert_eq!(p.fatigue, 0.0);
        assert!(!p.resting);
    }

    #[test]
    fn awake_pet_does_not_recover() {
        let mut p = pet(10.0, 1.0, 3.0, 0.0);
        p.tick_at(Instant::now() + Duration::from_secs(60));
        assert_eq!(p.sleepiness, 3.0);
        p.rest_at(Instant::now());
        p.awake();
        assert!(!p.resting && p.rest_started.is_none());
    }
}
