//! Typed, N-dimensional blocks of variable data.
//!
use std::fmt::Debug;

use ndarray::{ArrayD, IxDyn, Slice};
use num_traits::ToPrimitive;
use paste::paste;

use crate::{
    errors::{Error, Result},
    range::Selection,
    schema::DataType,
};

/// A block of values of one element type, stored row-major over the owning variable's declared
/// dimension order.
///
#[derive(Clone, Debug, PartialEq)]
pub enum DataBlock {
    Byte(ArrayD<i8>),
    Char(ArrayD<u8>),
    Short(ArrayD<i16>),
    Int(ArrayD<i32>),
    Float(ArrayD<f32>),
    Double(ArrayD<f64>),
}

/// Rust types that can be stored in a `DataBlock`
///
pub trait Element: Copy + Debug + PartialEq + ToPrimitive + Send + Sync + 'static {
    const DATA_TYPE: DataType;

    /// Default fill value for unwritten data
    const FILL: Self;

    fn wrap(array: ArrayD<Self>) -> DataBlock;

    fn unwrap_ref(block: &DataBlock) -> Option<&ArrayD<Self>>;
}

macro_rules! Element {
    ($variant:ident, $type:ty, $fill:expr) => {
        impl Element for $type {
            const DATA_TYPE: DataType = DataType::$variant;
            const FILL: Self = $fill;

            fn wrap(array: ArrayD<Self>) -> DataBlock {
                DataBlock::$variant(array)
            }

            fn unwrap_ref(block: &DataBlock) -> Option<&ArrayD<Self>> {
                match block {
                    DataBlock::$variant(array) => Some(array),
                    _ => None,
                }
            }
        }

        impl From<ArrayD<$type>> for DataBlock {
            fn from(array: ArrayD<$type>) -> Self {
                Self::$variant(array)
            }
        }

        paste! {
            impl DataBlock {
                pub fn [<as_ $variant:lower>](&self) -> Option<&ArrayD<$type>> {
                    <$type as Element>::unwrap_ref(self)
                }
            }
        }
    };
}

Element!(Byte, i8, -127);
Element!(Char, u8, 0);
Element!(Short, i16, -32767);
Element!(Int, i32, -2147483647);
Element!(Float, f32, 9.96921e36);
Element!(Double, f64, 9.969209968386869e36);

/// Apply `$body` to the array inside any variant of `$block`, binding it to `$array`
macro_rules! each_variant {
    ($block:expr, $array:ident => $body:expr) => {
        match $block {
            DataBlock::Byte($array) => $body,
            DataBlock::Char($array) => $body,
            DataBlock::Short($array) => $body,
            DataBlock::Int($array) => $body,
            DataBlock::Float($array) => $body,
            DataBlock::Double($array) => $body,
        }
    };
}

impl DataBlock {
    /// A block of `shape` holding the default fill value of `data_type`
    pub fn filled(data_type: DataType, shape: &[usize]) -> Self {
        let shape = IxDyn(shape);
        match data_type {
            DataType::Byte => Self::Byte(ArrayD::from_elem(shape, i8::FILL)),
            DataType::Char => Self::Char(ArrayD::from_elem(shape, u8::FILL)),
            DataType::Short => Self::Short(ArrayD::from_elem(shape, i16::FILL)),
            DataType::Int => Self::Int(ArrayD::from_elem(shape, i32::FILL)),
            DataType::Float => Self::Float(ArrayD::from_elem(shape, f32::FILL)),
            DataType::Double => Self::Double(ArrayD::from_elem(shape, f64::FILL)),
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Self::Byte(_) => DataType::Byte,
            Self::Char(_) => DataType::Char,
            Self::Short(_) => DataType::Short,
            Self::Int(_) => DataType::Int,
            Self::Float(_) => DataType::Float,
            Self::Double(_) => DataType::Double,
        }
    }

    pub fn shape(&self) -> &[usize] {
        each_variant!(self, array => array.shape())
    }

    pub fn len(&self) -> usize {
        each_variant!(self, array => array.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy out the hyper-rectangle described by `selection`.
    ///
    /// The caller is responsible for checking that `selection` fits this block's shape.
    ///
    pub fn slice(&self, selection: &Selection) -> Self {
        let ranges = selection.ranges();
        each_variant!(self, array => array
            .slice_each_axis(|axis| Slice::from(ranges[axis.axis.index()].as_std()))
            .to_owned()
            .into())
    }

    /// Overwrite the region of this block starting at `origin` with the contents of `block`.
    ///
    /// # Arguments
    ///
    /// * `variable` - Name of the variable this block belongs to, for error reporting.
    /// * `origin` - Zero based index of the corner where `block` lands.
    /// * `block` - The values to write. Must have the same element type as `self`.
    ///
    pub fn assign(&mut self, variable: &str, origin: &[usize], block: &DataBlock) -> Result<()> {
        let expected = self.data_type();
        let found = block.data_type();
        if expected != found {
            return Err(Error::TypeMismatch {
                variable: variable.to_string(),
                expected,
                found,
            });
        }

        let target = self.shape().to_vec();
        let shape = block.shape().to_vec();
        let fits = origin.len() == target.len()
            && shape.len() == target.len()
            && origin
                .iter()
                .zip(&shape)
                .zip(&target)
                .all(|((&start, &len), &size)| {
                    start.checked_add(len).is_some_and(|end| end <= size)
                });
        if !fits {
            return Err(Error::ShapeMismatch {
                variable: variable.to_string(),
                block: shape,
                target,
            });
        }

        let region = |index: usize| Slice::from(origin[index]..origin[index] + shape[index]);
        match (self, block) {
            (Self::Byte(dest), Self::Byte(src)) => {
                dest.slice_each_axis_mut(|axis| region(axis.axis.index()))
                    .assign(src);
            }
            (Self::Char(dest), Self::Char(src)) => {
                dest.slice_each_axis_mut(|axis| region(axis.axis.index()))
                    .assign(src);
            }
            (Self::Short(dest), Self::Short(src)) => {
                dest.slice_each_axis_mut(|axis| region(axis.axis.index()))
                    .assign(src);
            }
            (Self::Int(dest), Self::Int(src)) => {
                dest.slice_each_axis_mut(|axis| region(axis.axis.index()))
                    .assign(src);
            }
            (Self::Float(dest), Self::Float(src)) => {
                dest.slice_each_axis_mut(|axis| region(axis.axis.index()))
                    .assign(src);
            }
            (Self::Double(dest), Self::Double(src)) => {
                dest.slice_each_axis_mut(|axis| region(axis.axis.index()))
                    .assign(src);
            }
            // Types were compared above
            _ => unreachable!(),
        }

        Ok(())
    }

    /// Single value at `index`, widened to f64
    pub fn get_f64(&self, index: &[usize]) -> Option<f64> {
        each_variant!(self, array => array.get(index).and_then(|value| value.to_f64()))
    }

    /// All values in row-major order, widened to f64
    pub fn to_f64_vec(&self) -> Vec<f64> {
        each_variant!(self, array => array
            .iter()
            .map(|value| value.to_f64().unwrap_or(f64::NAN))
            .collect())
    }

    /// All values in row-major order, truncated to i64. `None` for values with no integer
    /// equivalent, such as NaN or the float fill value.
    pub fn to_i64_vec(&self) -> Vec<Option<i64>> {
        each_variant!(self, array => array.iter().map(|value| value.to_i64()).collect())
    }
}
