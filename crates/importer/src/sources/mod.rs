pub mod mlb;
