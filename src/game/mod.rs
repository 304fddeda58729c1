pub mod controller;
pub mod events;
pub mod overlay;
pub mod state;

pub use controller::GameController;
pub use events::GameEvent;
pub use overlay::OverlayDirective;
pub use state::{
    GameSnapshot, GameState, HintResponse, RecognitionOutcome, SessionOutcome, SessionPhase,
};
