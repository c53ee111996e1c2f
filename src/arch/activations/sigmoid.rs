#[derive(Clone, Copy, Debug, Default)]
pub struct Sigmoid;

impl Sigmoid {
    pub fn f(&self, z: f32) -> f32 {
        1.0 / (1.0 + (-z).exp())
    }

    pub fn df(&self, z: f32) -> f32 {
        let s = self.f(z);

        s * (1.0 - s)
    }
}
