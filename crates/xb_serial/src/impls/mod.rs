mod scalars;
mod std_types;
