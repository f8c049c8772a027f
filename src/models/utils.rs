use good_lp::{Solution, Variable};
use typed_index_collections::TiVec;

pub trait AddVars {
    type Out;

    /// Create a variable with a closure
    fn vars_with<E, F: FnMut(Self) -> Result<Variable, E>>(&self, func: F) -> Result<Self::Out, E>
    where
        Self: Sized;
}

impl AddVars for usize {
    type Out = Vec<Variable>;

    fn vars_with<E, F: FnMut(Self) -> Result<Variable, E>>(&self, mut func: F) -> Result<Self::Out, E>
    where
        Self: Sized,
    {
        let mut vec = Vec::with_capacity(*self);
        for i in 0..*self {
            vec.push(func(i)?);
        }

        Ok(vec)
    }
}

impl AddVars for (usize, usize) {
    type Out = Vec<<usize as AddVars>::Out>;

    fn vars_with<E, F: FnMut(Self) -> Result<Variable, E>>(&self, mut func: F) -> Result<Self::Out, E>
    where
        Self: Sized,
    {
        let mut out = Vec::with_capacity(self.0);
        for i in 0..self.0 {
            out.push(self.1.vars_with(|j| func((i, j)))?);
        }

        Ok(out)
    }
}

/// Trait that converts variable handles to their values in a solution
pub trait ConvertVars {
    type Out;
    fn convert<S: Solution>(&self, values: &S) -> Self::Out;
}

impl<T: ConvertVars> ConvertVars for Vec<T> {
    type Out = Vec<T::Out>;

    fn convert<S: Solution>(&self, values: &S) -> Self::Out {
        self.iter().map(|e| e.convert(values)).collect()
    }
}

impl<K, T: ConvertVars> ConvertVars for TiVec<K, T> {
    type Out = TiVec<K, T::Out>;

    fn convert<S: Solution>(&self, values: &S) -> Self::Out {
        self.iter().map(|e| e.convert(values)).collect()
    }
}

impl ConvertVars for Variable {
    type Out = f64;

    fn convert<S: Solution>(&self, values: &S) -> Self::Out {
        values.value(*self)
    }
}
