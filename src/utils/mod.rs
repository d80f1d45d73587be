pub(crate) mod async_task;

pub mod net;

#[cfg(test)]
mod async_task_test;
