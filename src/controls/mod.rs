pub mod arcball;

pub use arcball::ArcBall;
