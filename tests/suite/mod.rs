mod coalescing;
mod config;
mod end_to_end;
mod path_node;
mod pool;
mod semaphore;
