// Neos is an open source web search engine.
// Copyright (C) 2024 Yeonwoo Sung

pub mod evaluate;
pub mod train;

pub use train::TrainingRun;
