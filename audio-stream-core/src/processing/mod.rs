pub mod audio_clip;
pub mod ring_buffer;
