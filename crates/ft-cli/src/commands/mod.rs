pub mod block;
pub mod drop;
pub mod observe;
pub mod report;
pub mod status;
pub mod tag;
pub mod track;
pub mod util;
