mod repo;

pub use repo::{HashMapWorkoutStore, PgWorkoutStore, WorkoutStore};
