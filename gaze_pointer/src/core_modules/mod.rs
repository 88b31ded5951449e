pub mod frame;
pub mod gaze_mapper;
pub mod landmark;
pub mod mesh_input;
pub mod overlay;
pub mod screen;
