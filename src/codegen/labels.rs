/// Fresh branch labels for one class. The `if` and `while` counters are
/// independent and only ever increase.
#[derive(Debug, Default)]
pub struct LabelGenerator {
    if_index: usize,
    while_index: usize,
}

impl LabelGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `(false_label, end_label)` for an `if` statement.
    pub fn new_if(&mut self) -> (String, String) {
        let n = self.if_index;
        self.if_index += 1;
        (format!("IF_FALSE{n}"), format!("IF_END{n}"))
    }

    /// Returns `(top_label, end_label)` for a `while` statement.
    pub fn new_while(&mut self) -> (String, String) {
        let n = self.while_index;
        self.while_index += 1;
        (format!("WHILE_EXP{n}"), format!("WHILE_END{n}"))
    }
}
