pub mod acquisition;
pub mod controls;
pub mod detection_request;
pub mod detection_worker;
pub mod face_card;
pub mod orchestrator;
pub mod session;
