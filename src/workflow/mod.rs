pub mod session;
pub mod session_state;

pub use session::{AuthoringSession, MatrixRequest, SolutionRequest, TestRequest};
pub use session_state::SessionState;
