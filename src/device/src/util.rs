pub use ash::vk;

pub type SmallVec<T, const N: usize> = smallvec::SmallVec<[T; N]>;

/// Unique identity of a device-created resource. Backends refer to
/// bound resources by id rather than by reference.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ResourceId(pub(crate) u64);

impl ResourceId {
    pub fn index(self) -> u64 {
        self.0
    }
}

/// Declares an enum mirroring a subset of a Vulkan enum, with a
/// conversion into the Vulkan type. The Vulkan type shares the enum's
/// name unless given with `as`.
macro_rules! wrap_vk_enum {
    (
        $(#[$($meta:meta)*])*
        $vis:vis enum $name:ident as $vk_name:ident {
            $(
                $(#[$($var_meta:meta)*])*
                $var:ident = $vk_var:ident,
            )*
        }
    ) => {
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        $(#[$($meta)*])*
        $vis enum $name {
            $($(#[$($var_meta)*])* $var,)*
        }

        impl From<$name> for $crate::vk::$vk_name {
            fn from(val: $name) -> Self {
                match val {
                    $($name::$var => $crate::vk::$vk_name::$vk_var,)*
                }
            }
        }
    };
    (
        $(#[$($meta:meta)*])*
        $vis:vis enum $name:ident {
            $(
                $(#[$($var_meta:meta)*])*
                $var:ident = $vk_var:ident,
            )*
        }
    ) => {
        wrap_vk_enum! {
            $(#[$($meta)*])*
            $vis enum $name as $name {
                $(
                    $(#[$($var_meta)*])*
                    $var = $vk_var,
                )*
            }
        }
    };
}
