mod persistence;
mod ticks;
