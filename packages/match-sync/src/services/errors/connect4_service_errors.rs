#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Connect4Error {
    ColumnOutOfRange(usize),
    ColumnFull(usize),
    GameOver,
}

impl std::fmt::Display for Connect4Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Connect4Error::ColumnOutOfRange(column) => {
                write!(f, "Column {} is off the board", column)
            }
            Connect4Error::ColumnFull(column) => write!(f, "Column {} is full", column),
            Connect4Error::GameOver => write!(f, "Game is already over"),
        }
    }
}

impl std::error::Error for Connect4Error {}
