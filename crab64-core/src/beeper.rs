pub trait Chip64Beeper {
    fn play(&mut self);
    fn pause(&mut self);
}
