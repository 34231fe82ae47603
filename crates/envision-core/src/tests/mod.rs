mod coordinator;
mod export;
mod parse;
