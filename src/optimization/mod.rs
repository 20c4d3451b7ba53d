mod adam;
mod apply;
mod dispatch;
mod gradient_descent;
mod optimizer;

pub use adam::Adam;
pub use dispatch::AnyOptimizer;
pub use gradient_descent::GradientDescent;
pub use optimizer::Optimizer;
