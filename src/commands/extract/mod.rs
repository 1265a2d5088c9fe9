mod chunker;
mod fonts;
mod normalize;
mod run;
mod tags;
#[cfg(test)]
mod tests;
mod toc;

pub use run::run;
