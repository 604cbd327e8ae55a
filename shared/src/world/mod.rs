pub mod object;
pub mod variable;
