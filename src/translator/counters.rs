/// Counters behind the labels synthesized by the translator. They only grow,
/// and one set is shared by every unit written to the same output.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelCounters {
    eq: usize,
    gt: usize,
    lt: usize,
    call: usize,
}

impl LabelCounters {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(counter: &mut usize) -> usize {
        let n = *counter;
        *counter += 1;
        n
    }

    pub fn next_eq(&mut self) -> usize {
        Self::bump(&mut self.eq)
    }

    pub fn next_gt(&mut self) -> usize {
        Self::bump(&mut self.gt)
    }

    pub fn next_lt(&mut self) -> usize {
        Self::bump(&mut self.lt)
    }

    pub fn next_call(&mut self) -> usize {
        Self::bump(&mut self.call)
    }
}
