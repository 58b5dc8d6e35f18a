/// 展示层
/// 
/// 快照到展示行的映射，以及展示行到具体渲染面的转换

pub mod mapper;
pub mod render;

pub use mapper::to_rows;
pub use render::RenderFormat;
