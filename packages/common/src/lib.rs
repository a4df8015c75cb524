pub mod comparator_mode;
pub mod judge_result;
pub mod problem_status;
pub mod test_case;
pub mod text;
pub mod worker;
pub mod workflow;

pub use comparator_mode::ComparatorMode;
pub use problem_status::ProblemStatus;
pub use test_case::{InMemoryProblemRepository, Problem, ProblemRepository, TestCase};
