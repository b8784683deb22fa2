mod common;
mod matchers;
